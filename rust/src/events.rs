use serde_json::Value;

use crate::state::{Message, MessageSource};

/// Push channel carrying inbound and echoed messages.
pub const DEFAULT_EVENT_CHANNEL: &str = "new_message";

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("malformed push payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("inbound message carries no sender public key")]
    MissingSender,
}

/// Validate a raw push payload into a [`Message`].
///
/// Inbound (`Them`) messages must name their sender; the conversation filter
/// depends on it. Anything else about the originating event is optional.
pub fn parse_push_payload(payload: Value) -> Result<Message, IngestError> {
    let message: Message = serde_json::from_value(payload)?;
    if message.source == MessageSource::Them
        && message
            .origin
            .sender_public_key
            .as_deref()
            .map_or(true, str::is_empty)
    {
        return Err(IngestError::MissingSender);
    }
    Ok(message)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_inbound_with_sender() {
        let m = parse_push_payload(json!({
            "content": "hi",
            "source": "Them",
            "origin": { "pubkey": "bpk", "kind": 4, "tags": [] }
        }))
        .unwrap();
        assert_eq!(m.origin.sender_public_key.as_deref(), Some("bpk"));
    }

    #[test]
    fn echo_may_omit_origin() {
        let m = parse_push_payload(json!({ "content": "hi", "source": "Me" })).unwrap();
        assert_eq!(m.source, MessageSource::Me);
        assert!(m.origin.sender_public_key.is_none());
    }

    #[test]
    fn rejects_inbound_without_sender() {
        for origin in [json!({}), json!({ "pubkey": "" })] {
            let err = parse_push_payload(json!({
                "content": "hi",
                "source": "Them",
                "origin": origin
            }))
            .unwrap_err();
            assert!(matches!(err, IngestError::MissingSender));
        }
    }

    #[test]
    fn rejects_garbage() {
        for payload in [
            json!("hello"),
            json!({ "content": "hi" }),
            json!({ "content": "hi", "source": "Somebody" }),
            json!({ "content": 5, "source": "Me" }),
        ] {
            assert!(matches!(
                parse_push_payload(payload),
                Err(IngestError::Malformed(_))
            ));
        }
    }
}
