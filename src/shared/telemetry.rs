use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. `RUST_LOG` wins over `default_level`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
