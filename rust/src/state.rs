use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug)]
pub struct AppState {
    pub rev: u64,
    pub identity: Identity,
    pub directory: DirectoryState,
    pub conversation: Conversation,
    pub busy: BusyState,
}

impl AppState {
    pub fn empty() -> Self {
        Self {
            rev: 0,
            identity: Identity::empty(),
            directory: DirectoryState::default(),
            conversation: Conversation::empty(),
            busy: BusyState::idle(),
        }
    }
}

/// Local keypair. Both keys are empty or both are populated.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub secret_key: String,
    pub public_key: String,
}

impl Identity {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds an identity from a `[secret_key, public_key]` pair, rejecting
    /// half-populated pairs.
    pub fn from_pair(secret_key: String, public_key: String) -> Option<Self> {
        if secret_key.is_empty() != public_key.is_empty() {
            return None;
        }
        Some(Self {
            secret_key,
            public_key,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.secret_key.is_empty() && self.public_key.is_empty()
    }
}

// Keeps the secret key out of `{:?}` output (state snapshots get logged).
impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secret = if self.secret_key.is_empty() {
            ""
        } else {
            "<redacted>"
        };
        f.debug_struct("Identity")
            .field("secret_key", &secret)
            .field("public_key", &self.public_key)
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub alias: String,
    #[serde(alias = "pk")]
    pub public_key: String,
}

impl Contact {
    pub fn new(alias: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            public_key: public_key.into(),
        }
    }
}

/// Contacts and relays as last reported by the backend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectoryState {
    pub relays: Vec<String>,
    pub contacts: Vec<Contact>,
}

impl DirectoryState {
    pub fn contact(&self, public_key: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.public_key == public_key)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageSource {
    Me,
    Them,
}

/// The part of the originating event the core cares about.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageOrigin {
    #[serde(rename = "pubkey", default, skip_serializing_if = "Option::is_none")]
    pub sender_public_key: Option<String>,
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub content: String,
    pub source: MessageSource,
    #[serde(alias = "ev", default)]
    pub origin: MessageOrigin,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub contact: Contact,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Placeholder held until the first selection resolves.
    pub fn empty() -> Self {
        Self::new(Contact::new("", ""))
    }

    pub fn new(contact: Contact) -> Self {
        Self {
            contact,
            messages: vec![],
        }
    }

    /// Push filter: our own echoes always land in the open conversation,
    /// inbound messages only when they come from its contact.
    pub fn accepts(&self, message: &Message) -> bool {
        match message.source {
            MessageSource::Me => true,
            MessageSource::Them => {
                message.origin.sender_public_key.as_deref()
                    == Some(self.contact.public_key.as_str())
            }
        }
    }
}

/// "In flight" flags for backend round trips the UI should reflect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusyState {
    pub loading_directory: bool,
    pub loading_conversation: bool,
    pub resolving_identity: bool,
}

impl BusyState {
    pub fn idle() -> Self {
        Self {
            loading_directory: false,
            loading_conversation: false,
            resolving_identity: false,
        }
    }
}
