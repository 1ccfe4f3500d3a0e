use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use loquaz_core::{BoxFuture, CommandGateway, GatewayError, MemoryBackend};
use serde_json::Value;
use tokio::sync::oneshot;

/// Wraps a [`MemoryBackend`] so chosen commands for chosen keys only reach
/// the backend when the test says so. Lets tests pick resolution order.
#[derive(Clone)]
pub struct GatedGateway {
    pub backend: MemoryBackend,
    gates: Arc<Mutex<HashMap<(String, String), oneshot::Receiver<()>>>>,
    fetches_done: Arc<AtomicUsize>,
}

impl GatedGateway {
    pub fn new(backend: MemoryBackend) -> Self {
        Self {
            backend,
            gates: Arc::new(Mutex::new(HashMap::new())),
            fetches_done: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Hold the next `command` whose `publicKey` param is `public_key` until
    /// the returned sender fires (or is dropped).
    pub fn hold(&self, command: &str, public_key: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .unwrap()
            .insert((command.to_string(), public_key.to_string()), rx);
        tx
    }

    pub fn fetches_done(&self) -> usize {
        self.fetches_done.load(Ordering::SeqCst)
    }
}

impl CommandGateway for GatedGateway {
    fn invoke(&self, command: &str, params: Value) -> BoxFuture<'static, Result<Value, GatewayError>> {
        let is_fetch = command == "get_conversation";
        let gate = params
            .get("publicKey")
            .and_then(Value::as_str)
            .and_then(|pk| {
                self.gates
                    .lock()
                    .unwrap()
                    .remove(&(command.to_string(), pk.to_string()))
            });
        let backend = self.backend.clone();
        let done = self.fetches_done.clone();
        let command = command.to_string();
        Box::pin(async move {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            let result = backend.invoke(&command, params).await;
            if is_fetch {
                done.fetch_add(1, Ordering::SeqCst);
            }
            result
        })
    }
}
