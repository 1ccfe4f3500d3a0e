// In-process backend: contacts, relays and per-contact history held in memory.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use rand::RngCore;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use super::{BoxFuture, Command, CommandGateway, EventSource, EventStream, GatewayError};
use crate::events::DEFAULT_EVENT_CHANNEL;
use crate::state::{Contact, Conversation, Message, MessageOrigin, MessageSource};

#[derive(Default)]
struct Inner {
    key_pair: Option<(String, String)>,
    relays: BTreeSet<String>,
    // public key -> contact
    contacts: BTreeMap<String, Contact>,
    histories: HashMap<String, Vec<Message>>,
    subscribers: HashMap<String, Vec<flume::Sender<Value>>>,
    fail_next: HashSet<String>,
    invoked: Vec<String>,
    event_seq: u64,
}

impl Inner {
    fn next_event_id(&mut self) -> String {
        self.event_seq += 1;
        format!("{:016x}", self.event_seq)
    }

    fn publish(&mut self, channel: &str, payload: Value) {
        if let Some(subs) = self.subscribers.get_mut(channel) {
            subs.retain(|tx| tx.send(payload.clone()).is_ok());
        }
    }

    fn handle(&mut self, command: Command) -> Result<Value, GatewayError> {
        let name = command.name();
        match command {
            Command::GetConfig => {
                let relays: Vec<&String> = self.relays.iter().collect();
                let contacts: Vec<&Contact> = self.contacts.values().collect();
                Ok(json!([relays, contacts]))
            }
            Command::AddContact { alias, public_key } => {
                if !is_hex_key(&public_key) {
                    return Err(GatewayError::rejected(name, format!("Invalid PK {public_key}")));
                }
                self.histories.entry(public_key.clone()).or_default();
                self.contacts
                    .insert(public_key.clone(), Contact { alias, public_key });
                Ok(Value::Null)
            }
            Command::RemoveContact { contact } => {
                self.contacts.remove(&contact.public_key);
                self.histories.remove(&contact.public_key);
                Ok(Value::Null)
            }
            Command::AddRelay { url } => {
                if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                    return Err(GatewayError::rejected(name, "Could not add relay"));
                }
                self.relays.insert(url);
                Ok(Value::Null)
            }
            Command::RemoveRelay { url } => {
                self.relays.remove(&url);
                Ok(Value::Null)
            }
            Command::RestoreKeyPair { secret_key } => {
                if !is_hex_key(&secret_key) {
                    return Err(GatewayError::rejected(name, "invalid secret key"));
                }
                let public_key = derive_public_key(&secret_key)
                    .ok_or_else(|| GatewayError::rejected(name, "invalid secret key"))?;
                self.key_pair = Some((secret_key.clone(), public_key.clone()));
                Ok(json!([secret_key, public_key]))
            }
            Command::GenerateKeyPair => {
                let mut bytes = [0u8; 32];
                rand::thread_rng().fill_bytes(&mut bytes);
                let secret_key = hex::encode(bytes);
                let public_key = derive_public_key(&secret_key)
                    .ok_or_else(|| GatewayError::rejected(name, "key derivation failed"))?;
                self.key_pair = Some((secret_key.clone(), public_key.clone()));
                Ok(json!([secret_key, public_key]))
            }
            Command::GetConversation { public_key } => {
                let contact = self
                    .contacts
                    .get(&public_key)
                    .cloned()
                    .ok_or_else(|| GatewayError::rejected(name, "unknown contact"))?;
                let messages = self.histories.get(&public_key).cloned().unwrap_or_default();
                serde_json::to_value(Conversation { contact, messages })
                    .map_err(|e| GatewayError::rejected(name, e.to_string()))
            }
            Command::SendMsg {
                public_key,
                content,
            } => {
                let Some((_, my_public_key)) = self.key_pair.clone() else {
                    return Err(GatewayError::rejected(name, "no key pair"));
                };
                if !self.contacts.contains_key(&public_key) {
                    return Err(GatewayError::rejected(name, "unknown contact"));
                }
                let message = Message {
                    content,
                    source: MessageSource::Me,
                    origin: MessageOrigin {
                        sender_public_key: Some(my_public_key),
                        event_id: Some(self.next_event_id()),
                        created_at: None,
                    },
                };
                self.record_and_publish(&public_key, message);
                Ok(Value::Null)
            }
        }
    }

    fn record_and_publish(&mut self, peer: &str, message: Message) {
        let payload = serde_json::to_value(&message).unwrap_or(Value::Null);
        self.histories.entry(peer.to_string()).or_default().push(message);
        self.publish(DEFAULT_EVENT_CHANNEL, payload);
    }
}

/// Backend that lives in the same process. Implements both the command and
/// the push side, so one instance can be handed to `App::new` twice.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    /// Simulate a message arriving from `sender`. Messages from senders that
    /// are not contacts are dropped; returns whether it was delivered.
    pub fn deliver(&self, sender: &str, content: &str) -> bool {
        let mut inner = self.lock();
        if !inner.contacts.contains_key(sender) {
            tracing::debug!(%sender, "dropping message from unknown sender");
            return false;
        }
        let message = Message {
            content: content.to_string(),
            source: MessageSource::Them,
            origin: MessageOrigin {
                sender_public_key: Some(sender.to_string()),
                event_id: Some(inner.next_event_id()),
                created_at: None,
            },
        };
        inner.record_and_publish(sender, message);
        true
    }

    /// Push an arbitrary payload on `channel`, bypassing history.
    pub fn publish_raw(&self, channel: &str, payload: Value) {
        self.lock().publish(channel, payload);
    }

    /// Reject the next invocation of `command`.
    pub fn fail_next(&self, command: &str) {
        self.lock().fail_next.insert(command.to_string());
    }

    /// Names of every command invoked so far, in order.
    pub fn invoked(&self) -> Vec<String> {
        self.lock().invoked.clone()
    }

    pub fn contacts(&self) -> Vec<Contact> {
        self.lock().contacts.values().cloned().collect()
    }

    pub fn relays(&self) -> Vec<String> {
        self.lock().relays.iter().cloned().collect()
    }

    pub fn history(&self, public_key: &str) -> Vec<Message> {
        self.lock()
            .histories
            .get(public_key)
            .cloned()
            .unwrap_or_default()
    }
}

impl CommandGateway for MemoryBackend {
    fn invoke(&self, command: &str, params: Value) -> BoxFuture<'static, Result<Value, GatewayError>> {
        let result = {
            let mut inner = self.lock();
            inner.invoked.push(command.to_string());
            if inner.fail_next.remove(command) {
                Err(GatewayError::rejected(command, "injected failure"))
            } else {
                Command::parse(command, &params).and_then(|cmd| inner.handle(cmd))
            }
        };
        Box::pin(async move { result })
    }
}

impl EventSource for MemoryBackend {
    fn subscribe(&self, channel: &str) -> Result<EventStream, GatewayError> {
        let (tx, rx) = flume::unbounded();
        self.lock()
            .subscribers
            .entry(channel.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }
}

fn is_hex_key(input: &str) -> bool {
    input.len() == 64 && input.chars().all(|ch| ch.is_ascii_hexdigit())
}

fn derive_public_key(secret_hex: &str) -> Option<String> {
    let secret = hex::decode(secret_hex).ok()?;
    Some(hex::encode(Sha256::digest(&secret)))
}
