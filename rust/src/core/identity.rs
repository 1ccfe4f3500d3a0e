// Keypair lifecycle. Unlike the directory, results are applied directly.

use super::*;
use crate::gateway::GatewayError;
use crate::state::Identity;

impl AppCore {
    fn begin_identity_request(&mut self) -> u64 {
        self.identity_in_flight += 1;
        self.set_busy(|b| b.resolving_identity = true);
        self.identity_epoch
    }

    pub(super) fn restore_key_pair(&mut self, secret_key: String) {
        let epoch = self.begin_identity_request();
        let gateway = self.gateway.clone();
        self.spawn_internal(async move {
            let result = gateway.restore_key_pair(&secret_key).await;
            InternalEvent::KeyPairResolved { epoch, result }
        });
    }

    pub(super) fn generate_key_pair(&mut self) {
        let epoch = self.begin_identity_request();
        let gateway = self.gateway.clone();
        self.spawn_internal(async move {
            let result = gateway.generate_key_pair().await;
            InternalEvent::KeyPairResolved { epoch, result }
        });
    }

    /// Local only; the backend is not told. Requests still in flight are
    /// dropped when they land.
    pub(super) fn reset_key_pair(&mut self) {
        self.identity_epoch += 1;
        if self.state.identity.is_empty() {
            return;
        }
        self.state.identity = Identity::empty();
        tracing::info!("key pair reset");
        self.emit_state();
    }

    pub(super) fn apply_key_pair(&mut self, epoch: u64, result: Result<Identity, GatewayError>) {
        self.identity_in_flight = self.identity_in_flight.saturating_sub(1);
        let resolving = self.identity_in_flight > 0;
        let mut changed = self.state.busy.resolving_identity != resolving;
        self.state.busy.resolving_identity = resolving;

        match result {
            Ok(_) if epoch != self.identity_epoch => {
                tracing::debug!(epoch, current = self.identity_epoch, "key pair reset meanwhile");
            }
            Ok(identity) => {
                tracing::info!(public_key = %identity.public_key, "key pair applied");
                self.state.identity = identity;
                changed = true;
            }
            Err(e) => tracing::warn!(err = %e, "key pair request failed"),
        }

        if changed {
            self.emit_state();
        }
    }
}
