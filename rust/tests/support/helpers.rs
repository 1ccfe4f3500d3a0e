use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use loquaz_core::{App, AppReconciler, AppState, AppUpdate, Command, CommandGateway, MemoryBackend};

pub const ALICE: &str = "a11ce0000000000000000000000000000000000000000000000000000000000a";
pub const BOB: &str = "b0b000000000000000000000000000000000000000000000000000000000000b";
pub const CAROL: &str = "ca401000000000000000000000000000000000000000000000000000000000c0";

pub fn wait_until(what: &str, timeout: Duration, f: impl FnMut() -> bool) {
    wait_until_with_poll(what, timeout, Duration::from_millis(20), f);
}

pub fn wait_until_with_poll(
    what: &str,
    timeout: Duration,
    poll: Duration,
    mut f: impl FnMut() -> bool,
) {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if f() {
            return;
        }
        std::thread::sleep(poll);
    }
    panic!("{what}: condition not met within {timeout:?}");
}

pub fn wait_for_state(app: &App, what: &str, mut f: impl FnMut(&AppState) -> bool) -> AppState {
    let mut last = app.state();
    wait_until(what, Duration::from_secs(5), || {
        last = app.state();
        f(&last)
    });
    last
}

/// Start an app whose command and push sides are both `backend`.
pub fn start_app(backend: &MemoryBackend) -> (Arc<App>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let app = App::new(
        dir.path().to_string_lossy().into_owned(),
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
    );
    (app, dir)
}

pub fn write_config(data_dir: &str, load_on_start: bool) {
    let path = std::path::Path::new(data_dir).join("loquaz_config.json");
    let v = serde_json::json!({
        "load_on_start": load_on_start,
        "worker_threads": 1,
    });
    std::fs::write(path, serde_json::to_vec(&v).unwrap()).unwrap();
}

/// Run a command directly against the backend (test setup, bypassing the app).
pub fn seed(backend: &MemoryBackend, command: Command) {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(backend.invoke(command.name(), command.params()))
        .unwrap();
}

#[derive(Clone)]
pub struct Collector(pub Arc<Mutex<Vec<AppUpdate>>>);

impl Collector {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(Vec::new())))
    }

    pub fn revs(&self) -> Vec<u64> {
        self.0.lock().unwrap().iter().map(AppUpdate::rev).collect()
    }

    pub fn last_state(&self) -> Option<AppState> {
        self.0.lock().unwrap().iter().rev().find_map(|u| match u {
            AppUpdate::FullState(s) => Some(s.clone()),
        })
    }
}

impl AppReconciler for Collector {
    fn reconcile(&self, update: AppUpdate) {
        self.0.lock().unwrap().push(update);
    }
}
