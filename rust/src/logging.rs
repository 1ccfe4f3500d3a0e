/// Install a stderr `tracing` subscriber.
///
/// Filter comes from `RUST_LOG`, falling back to `loquaz_core=debug,info`.
/// Called once at the start of `App::new()`; later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loquaz_core=debug,info".into()),
        )
        .try_init();
}
