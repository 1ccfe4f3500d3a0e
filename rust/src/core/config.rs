use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use super::AppCore;
use crate::events::DEFAULT_EVENT_CHANNEL;

const CONFIG_FILE_NAME: &str = "loquaz_config.json";
const DEFAULT_WORKER_THREADS: usize = 2;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct AppConfig {
    // Run `get_config` as soon as the actor starts.
    pub(super) load_on_start: Option<bool>,
    pub(super) event_channel: Option<String>,
    pub(super) worker_threads: Option<usize>,
}

impl AppConfig {
    pub(super) fn worker_threads(&self) -> usize {
        self.worker_threads
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_WORKER_THREADS)
    }
}

pub(super) fn load_app_config(data_dir: &str) -> AppConfig {
    let path = Path::new(data_dir).join(CONFIG_FILE_NAME);
    if !path.exists() {
        return AppConfig::default();
    }
    match read_app_config(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(err = %format!("{e:#}"), "ignoring app config");
            AppConfig::default()
        }
    }
}

fn read_app_config(path: &Path) -> anyhow::Result<AppConfig> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
}

impl AppCore {
    pub(super) fn initial_load_enabled(&self) -> bool {
        // Used to keep Rust tests deterministic.
        if std::env::var("LOQUAZ_SKIP_INITIAL_LOAD").ok().as_deref() == Some("1") {
            return false;
        }
        self.config.load_on_start.unwrap_or(true)
    }

    pub(super) fn event_channel(&self) -> String {
        self.config
            .event_channel
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_EVENT_CHANNEL)
            .to_string()
    }
}
