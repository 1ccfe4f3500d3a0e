use crate::state::Contact;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    // Identity
    RestoreKeyPair {
        secret_key: String,
    },
    GenerateKeyPair,
    ResetKeyPair,

    // Directory
    LoadConfig,
    AddContact {
        alias: String,
        public_key: String,
    },
    RemoveContact {
        contact: Contact,
    },
    AddRelay {
        url: String,
    },
    RemoveRelay {
        url: String,
    },

    // Conversation
    SelectConversation {
        public_key: String,
    },
    SendMessage {
        public_key: String,
        content: String,
    },
}

impl AppAction {
    /// Log-safe action tag (never includes secrets like `secret_key`).
    pub fn tag(&self) -> &'static str {
        match self {
            // Identity
            AppAction::RestoreKeyPair { .. } => "RestoreKeyPair",
            AppAction::GenerateKeyPair => "GenerateKeyPair",
            AppAction::ResetKeyPair => "ResetKeyPair",

            // Directory
            AppAction::LoadConfig => "LoadConfig",
            AppAction::AddContact { .. } => "AddContact",
            AppAction::RemoveContact { .. } => "RemoveContact",
            AppAction::AddRelay { .. } => "AddRelay",
            AppAction::RemoveRelay { .. } => "RemoveRelay",

            // Conversation
            AppAction::SelectConversation { .. } => "SelectConversation",
            AppAction::SendMessage { .. } => "SendMessage",
        }
    }
}
