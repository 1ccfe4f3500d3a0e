mod config;
mod conversation;
mod directory;
mod identity;
mod ingest;

use std::future::Future;
use std::sync::{Arc, RwLock};

use flume::Sender;

use crate::actions::AppAction;
use crate::gateway::{Command, CommandGateway, EventSource, Gateway};
use crate::state::{AppState, BusyState};
use crate::updates::{AppUpdate, CoreMsg, InternalEvent};

/// Single-threaded owner of [`AppState`].
///
/// Every mutation happens inside [`AppCore::handle_message`]; async work runs
/// on `runtime` and reports back through `core_sender`, so a transition is
/// always applied whole before the next message is looked at.
pub struct AppCore {
    pub state: AppState,
    rev: u64,

    update_sender: Sender<AppUpdate>,
    core_sender: Sender<CoreMsg>,
    shared_state: Arc<RwLock<AppState>>,

    config: config::AppConfig,
    runtime: tokio::runtime::Runtime,
    gateway: Gateway,
    ingestion_started: bool,

    // Reload tokens are drawn under this lock as each `get_config` goes out.
    reload_seq: Arc<tokio::sync::Mutex<u64>>,
    directory_applied: u64,
    directory_in_flight: usize,
    // Only the fetch for the latest selection may land.
    selection_token: u64,
    // Bumped by reset; key pair results from an older epoch are dropped.
    identity_epoch: u64,
    identity_in_flight: usize,
}

impl AppCore {
    pub fn new(
        update_sender: Sender<AppUpdate>,
        core_sender: Sender<CoreMsg>,
        data_dir: String,
        shared_state: Arc<RwLock<AppState>>,
        gateway: Arc<dyn CommandGateway>,
    ) -> Self {
        let config = config::load_app_config(&data_dir);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.worker_threads())
            .enable_time()
            .build()
            .expect("tokio runtime");

        let this = Self {
            state: AppState::empty(),
            rev: 0,
            update_sender,
            core_sender,
            shared_state,
            config,
            runtime,
            gateway: Gateway::new(gateway),
            ingestion_started: false,
            reload_seq: Arc::new(tokio::sync::Mutex::new(0)),
            directory_applied: 0,
            directory_in_flight: 0,
            selection_token: 0,
            identity_epoch: 0,
            identity_in_flight: 0,
        };

        // Ensure App.state() has an immediately-available snapshot.
        let snapshot = this.state.clone();
        this.commit_state_snapshot(&snapshot);
        this
    }

    /// Subscribe to the push channel and run the initial directory load.
    pub fn start(&mut self, events: &dyn EventSource) {
        self.start_ingestion(events);
        if self.initial_load_enabled() {
            self.reload_directory();
        }
    }

    fn next_rev(&mut self) -> u64 {
        self.rev += 1;
        self.state.rev = self.rev;
        self.rev
    }

    fn commit_state_snapshot(&self, snapshot: &AppState) {
        match self.shared_state.write() {
            Ok(mut g) => *g = snapshot.clone(),
            Err(poison) => *poison.into_inner() = snapshot.clone(),
        }
    }

    fn emit_state(&mut self) {
        self.next_rev();
        let snapshot = self.state.clone();
        self.commit_state_snapshot(&snapshot);
        let _ = self.update_sender.send(AppUpdate::FullState(snapshot));
    }

    fn set_busy(&mut self, f: impl FnOnce(&mut BusyState)) {
        let mut next = self.state.busy.clone();
        f(&mut next);
        if next != self.state.busy {
            self.state.busy = next;
            self.emit_state();
        }
    }

    /// Run `work` on the runtime and feed its result back into the actor.
    fn spawn_internal<F>(&self, work: F)
    where
        F: Future<Output = InternalEvent> + Send + 'static,
    {
        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            let event = work.await;
            let _ = tx.send(CoreMsg::Internal(Box::new(event)));
        });
    }

    pub fn handle_message(&mut self, msg: CoreMsg) {
        match msg {
            CoreMsg::Action(action) => {
                // Never log `?action` directly: it can contain secrets (e.g. `secret_key`).
                tracing::info!(action = action.tag(), "dispatch");
                self.handle_action(action);
            }
            CoreMsg::Internal(internal) => self.handle_internal(*internal),
        }
    }

    fn handle_internal(&mut self, internal: InternalEvent) {
        match internal {
            InternalEvent::DirectoryLoaded { result } => self.apply_directory(result),
            InternalEvent::KeyPairResolved { epoch, result } => {
                self.apply_key_pair(epoch, result);
            }
            InternalEvent::ConversationFetched {
                token,
                public_key,
                result,
            } => self.apply_conversation(token, public_key, result),
            InternalEvent::PushMessageReceived { message } => self.ingest_message(message),
        }
    }

    fn handle_action(&mut self, action: AppAction) {
        match action {
            // Identity
            AppAction::RestoreKeyPair { secret_key } => self.restore_key_pair(secret_key),
            AppAction::GenerateKeyPair => self.generate_key_pair(),
            AppAction::ResetKeyPair => self.reset_key_pair(),

            // Directory
            AppAction::LoadConfig => self.reload_directory(),
            AppAction::AddContact { alias, public_key } => {
                self.mutate_directory(Command::AddContact { alias, public_key });
            }
            AppAction::RemoveContact { contact } => {
                self.mutate_directory(Command::RemoveContact { contact });
            }
            AppAction::AddRelay { url } => self.mutate_directory(Command::AddRelay { url }),
            AppAction::RemoveRelay { url } => self.mutate_directory(Command::RemoveRelay { url }),

            // Conversation
            AppAction::SelectConversation { public_key } => self.select_conversation(public_key),
            AppAction::SendMessage {
                public_key,
                content,
            } => self.send_message(public_key, content),
        }
    }
}
