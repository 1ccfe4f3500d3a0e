// Directory: mutate on the backend, then reload both sets from it.

use super::*;
use crate::gateway::GatewayError;
use crate::state::DirectoryState;

/// Reads the backend config under the reload lock. Tokens are handed out in
/// the order the reads are issued, so a higher token is always a newer
/// snapshot regardless of which mutation asked for it.
async fn read_snapshot(
    gateway: &Gateway,
    reload_seq: &tokio::sync::Mutex<u64>,
) -> Result<(u64, DirectoryState), GatewayError> {
    let mut seq = reload_seq.lock().await;
    *seq += 1;
    let token = *seq;
    gateway.get_config().await.map(|directory| (token, directory))
}

impl AppCore {
    fn begin_directory_request(&mut self) {
        self.directory_in_flight += 1;
        self.set_busy(|b| b.loading_directory = true);
    }

    pub(super) fn reload_directory(&mut self) {
        self.begin_directory_request();
        let gateway = self.gateway.clone();
        let reload_seq = self.reload_seq.clone();
        self.spawn_internal(async move {
            let result = read_snapshot(&gateway, &reload_seq).await;
            InternalEvent::DirectoryLoaded { result }
        });
    }

    /// Mutate, then reload, as one composed round trip. A rejected mutation
    /// ends the sequence without reloading.
    pub(super) fn mutate_directory(&mut self, command: Command) {
        self.begin_directory_request();
        let gateway = self.gateway.clone();
        let reload_seq = self.reload_seq.clone();
        self.spawn_internal(async move {
            let result = match gateway.execute(command).await {
                Ok(()) => read_snapshot(&gateway, &reload_seq).await,
                Err(e) => Err(e),
            };
            InternalEvent::DirectoryLoaded { result }
        });
    }

    pub(super) fn apply_directory(&mut self, result: Result<(u64, DirectoryState), GatewayError>) {
        self.directory_in_flight = self.directory_in_flight.saturating_sub(1);
        let loading = self.directory_in_flight > 0;
        let mut changed = false;
        if self.state.busy.loading_directory != loading {
            self.state.busy.loading_directory = loading;
            changed = true;
        }

        match result {
            Ok((token, directory)) if token > self.directory_applied => {
                self.directory_applied = token;
                tracing::info!(
                    token,
                    contacts = directory.contacts.len(),
                    relays = directory.relays.len(),
                    "directory reloaded"
                );
                if self.state.directory != directory {
                    self.state.directory = directory;
                    changed = true;
                }
            }
            Ok((token, _)) => {
                tracing::debug!(
                    token,
                    applied = self.directory_applied,
                    "discarding stale directory snapshot"
                );
            }
            Err(e) => tracing::warn!(err = %e, "directory command failed"),
        }

        if changed {
            self.emit_state();
        }
    }
}
