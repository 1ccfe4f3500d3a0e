// Push-event ingestion (async -> internal events).

use super::*;
use crate::events::parse_push_payload;

impl AppCore {
    /// Subscribe once for the life of the process. Payloads are validated
    /// here; only well-formed messages reach the actor.
    pub(super) fn start_ingestion(&mut self, events: &dyn EventSource) {
        if self.ingestion_started {
            tracing::warn!("push subscription already running");
            return;
        }
        let channel = self.event_channel();
        let rx = match events.subscribe(&channel) {
            Ok(rx) => rx,
            Err(e) => {
                tracing::error!(%channel, err = %e, "push subscription failed");
                return;
            }
        };
        self.ingestion_started = true;
        tracing::info!(%channel, "push subscription started");

        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            while let Ok(payload) = rx.recv_async().await {
                let message = match parse_push_payload(payload) {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::warn!(err = %e, "dropping push payload");
                        continue;
                    }
                };
                let sent = tx.send(CoreMsg::Internal(Box::new(
                    InternalEvent::PushMessageReceived { message },
                )));
                if sent.is_err() {
                    break;
                }
            }
            tracing::info!(%channel, "push subscription ended");
        });
    }
}
