// Active conversation: selection, sending, and push ingestion.

use super::*;
use crate::gateway::GatewayError;
use crate::state::{Contact, Conversation, Message};

impl AppCore {
    pub(super) fn select_conversation(&mut self, public_key: String) {
        self.selection_token = self.selection_token.wrapping_add(1);
        let token = self.selection_token;
        if self.state.directory.contact(&public_key).is_none() {
            // Still fetch; whatever the backend says about it is surfaced below.
            tracing::warn!(%public_key, "selecting a key missing from the directory");
        }
        self.set_busy(|b| b.loading_conversation = true);

        let gateway = self.gateway.clone();
        self.spawn_internal(async move {
            let result = gateway.get_conversation(&public_key).await;
            InternalEvent::ConversationFetched {
                token,
                public_key,
                result,
            }
        });
    }

    pub(super) fn apply_conversation(
        &mut self,
        token: u64,
        public_key: String,
        result: Result<Conversation, GatewayError>,
    ) {
        // Ignore stale results (a newer selection was issued meanwhile).
        if token != self.selection_token {
            tracing::debug!(
                token,
                latest = self.selection_token,
                %public_key,
                "discarding stale conversation fetch"
            );
            return;
        }
        self.state.busy.loading_conversation = false;

        match result {
            Ok(fetched) => {
                let contact = match self.state.directory.contact(&public_key) {
                    Some(c) => c.clone(),
                    None if fetched.contact.public_key == public_key => fetched.contact,
                    None => Contact::new("", public_key.clone()),
                };
                tracing::info!(
                    %public_key,
                    messages = fetched.messages.len(),
                    "conversation selected"
                );
                // Replaces whatever was ingested while the fetch was in flight.
                self.state.conversation = Conversation {
                    contact,
                    messages: fetched.messages,
                };
            }
            Err(e) => tracing::warn!(%public_key, err = %e, "conversation fetch failed"),
        }
        self.emit_state();
    }

    /// Fire-and-forget. The sent message comes back on the push channel.
    pub(super) fn send_message(&mut self, public_key: String, content: String) {
        let gateway = self.gateway.clone();
        self.runtime.spawn(async move {
            let command = Command::SendMsg {
                public_key: public_key.clone(),
                content,
            };
            if let Err(e) = gateway.execute(command).await {
                tracing::warn!(%public_key, err = %e, "send_msg failed");
            }
        });
    }

    pub(super) fn ingest_message(&mut self, message: Message) {
        if !self.state.conversation.accepts(&message) {
            tracing::debug!(
                sender = ?message.origin.sender_public_key,
                active = %self.state.conversation.contact.public_key,
                "dropping message for inactive conversation"
            );
            return;
        }
        self.state.conversation.messages.push(message);
        self.emit_state();
    }
}
