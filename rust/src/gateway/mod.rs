//! Request/response channel to the backend plus the push-event seam.
//!
//! Backends implement the untyped [`CommandGateway`] (command name + JSON
//! params in, JSON result out). The core only talks to it through [`Gateway`],
//! which builds the exact parameter objects and decodes results.

mod memory;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::state::{Contact, Conversation, DirectoryState, Identity};

pub use memory::MemoryBackend;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Payloads delivered on a push channel, in delivery order.
pub type EventStream = flume::Receiver<Value>;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{command} rejected: {reason}")]
    Rejected { command: String, reason: String },
    #[error("{command}: unexpected result shape: {source}")]
    Decode {
        command: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{command}: backend returned a half-populated key pair")]
    InvalidKeyPair { command: String },
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("backend unavailable")]
    Disconnected,
}

impl GatewayError {
    pub fn rejected(command: &str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            command: command.to_string(),
            reason: reason.into(),
        }
    }
}

/// One round trip to the backend. No retries, no timeout.
pub trait CommandGateway: Send + Sync + 'static {
    fn invoke(&self, command: &str, params: Value) -> BoxFuture<'static, Result<Value, GatewayError>>;
}

/// Source of unsolicited backend notifications.
pub trait EventSource: Send + Sync + 'static {
    fn subscribe(&self, channel: &str) -> Result<EventStream, GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    GetConfig,
    AddContact { alias: String, public_key: String },
    RemoveContact { contact: Contact },
    AddRelay { url: String },
    RemoveRelay { url: String },
    RestoreKeyPair { secret_key: String },
    GenerateKeyPair,
    GetConversation { public_key: String },
    SendMsg { public_key: String, content: String },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetConfig => "get_config",
            Command::AddContact { .. } => "add_contact",
            Command::RemoveContact { .. } => "remove_contact",
            Command::AddRelay { .. } => "add_relay",
            Command::RemoveRelay { .. } => "remove_relay",
            Command::RestoreKeyPair { .. } => "restore_key_pair",
            Command::GenerateKeyPair => "generate_key_pair",
            Command::GetConversation { .. } => "get_conversation",
            Command::SendMsg { .. } => "send_msg",
        }
    }

    pub fn params(&self) -> Value {
        match self {
            Command::GetConfig | Command::GenerateKeyPair => json!({}),
            Command::AddContact { alias, public_key } => {
                json!({ "alias": alias, "publicKey": public_key })
            }
            Command::RemoveContact { contact } => json!({ "contact": contact }),
            Command::AddRelay { url } | Command::RemoveRelay { url } => json!({ "url": url }),
            Command::RestoreKeyPair { secret_key } => json!({ "secretKey": secret_key }),
            Command::GetConversation { public_key } => json!({ "publicKey": public_key }),
            Command::SendMsg {
                public_key,
                content,
            } => json!({ "publicKey": public_key, "content": content }),
        }
    }

    /// Inverse of [`Command::name`] + [`Command::params`], for backends.
    pub fn parse(name: &str, params: &Value) -> Result<Self, GatewayError> {
        let text = |key: &str| -> Result<String, GatewayError> {
            params
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| GatewayError::rejected(name, format!("missing `{key}`")))
        };
        Ok(match name {
            "get_config" => Command::GetConfig,
            "add_contact" => Command::AddContact {
                alias: text("alias")?,
                public_key: text("publicKey")?,
            },
            "remove_contact" => {
                let raw = params
                    .get("contact")
                    .cloned()
                    .ok_or_else(|| GatewayError::rejected(name, "missing `contact`"))?;
                let contact = serde_json::from_value(raw)
                    .map_err(|e| GatewayError::rejected(name, format!("bad `contact`: {e}")))?;
                Command::RemoveContact { contact }
            }
            "add_relay" => Command::AddRelay { url: text("url")? },
            "remove_relay" => Command::RemoveRelay { url: text("url")? },
            "restore_key_pair" => Command::RestoreKeyPair {
                secret_key: text("secretKey")?,
            },
            "generate_key_pair" => Command::GenerateKeyPair,
            "get_conversation" => Command::GetConversation {
                public_key: text("publicKey")?,
            },
            "send_msg" => Command::SendMsg {
                public_key: text("publicKey")?,
                content: text("content")?,
            },
            other => return Err(GatewayError::UnknownCommand(other.to_string())),
        })
    }
}

/// Typed facade over a [`CommandGateway`].
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<dyn CommandGateway>,
}

impl Gateway {
    pub fn new(inner: Arc<dyn CommandGateway>) -> Self {
        Self { inner }
    }

    pub async fn invoke(&self, command: Command) -> Result<Value, GatewayError> {
        let name = command.name();
        tracing::debug!(command = name, "invoke");
        self.inner.invoke(name, command.params()).await
    }

    /// Invoke a command whose result carries nothing.
    pub async fn execute(&self, command: Command) -> Result<(), GatewayError> {
        self.invoke(command).await.map(|_| ())
    }

    pub async fn get_config(&self) -> Result<DirectoryState, GatewayError> {
        let raw = self.invoke(Command::GetConfig).await?;
        let (relays, contacts): (Vec<String>, Vec<Contact>) = decode("get_config", raw)?;
        Ok(DirectoryState { relays, contacts })
    }

    pub async fn restore_key_pair(&self, secret_key: &str) -> Result<Identity, GatewayError> {
        let raw = self
            .invoke(Command::RestoreKeyPair {
                secret_key: secret_key.to_string(),
            })
            .await?;
        decode_key_pair("restore_key_pair", raw)
    }

    pub async fn generate_key_pair(&self) -> Result<Identity, GatewayError> {
        let raw = self.invoke(Command::GenerateKeyPair).await?;
        decode_key_pair("generate_key_pair", raw)
    }

    pub async fn get_conversation(&self, public_key: &str) -> Result<Conversation, GatewayError> {
        let raw = self
            .invoke(Command::GetConversation {
                public_key: public_key.to_string(),
            })
            .await?;
        decode("get_conversation", raw)
    }
}

fn decode<T: DeserializeOwned>(command: &str, raw: Value) -> Result<T, GatewayError> {
    serde_json::from_value(raw).map_err(|source| GatewayError::Decode {
        command: command.to_string(),
        source,
    })
}

fn decode_key_pair(command: &str, raw: Value) -> Result<Identity, GatewayError> {
    let (secret_key, public_key): (String, String) = decode(command, raw)?;
    Identity::from_pair(secret_key, public_key).ok_or_else(|| GatewayError::InvalidKeyPair {
        command: command.to_string(),
    })
}
