use crate::gateway::GatewayError;
use crate::state::{AppState, Conversation, DirectoryState, Identity, Message};
use crate::AppAction;

#[derive(Clone, Debug)]
pub enum AppUpdate {
    FullState(AppState),
}

impl AppUpdate {
    pub fn rev(&self) -> u64 {
        match self {
            AppUpdate::FullState(s) => s.rev,
        }
    }
}

#[derive(Debug)]
pub enum CoreMsg {
    Action(AppAction),
    Internal(Box<InternalEvent>),
}

#[derive(Debug)]
pub enum InternalEvent {
    // Command results. Directory mutations report the reload that followed
    // them; the token orders snapshots by when `get_config` was sent.
    DirectoryLoaded {
        result: Result<(u64, DirectoryState), GatewayError>,
    },
    KeyPairResolved {
        epoch: u64,
        result: Result<Identity, GatewayError>,
    },
    ConversationFetched {
        token: u64,
        public_key: String,
        result: Result<Conversation, GatewayError>,
    },

    // Push channel (already validated).
    PushMessageReceived {
        message: Message,
    },
}
