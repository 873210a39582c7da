use tracing_subscriber::EnvFilter;

/// Build the event filter for a run.
///
/// `RUST_LOG` wins when set; otherwise `default_level` (e.g. `"info"` or
/// `"salary_tax_core=debug"`) is used.
pub fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialise the tracing subscriber.
///
/// Events go to stderr without timestamps or targets so that command
/// output on stdout stays machine-readable.
pub fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(default_level))
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
