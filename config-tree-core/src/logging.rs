use tracing_subscriber::EnvFilter;

/// Installs a global fmt subscriber. `RUST_LOG` takes precedence over
/// `default_level`. Intended for binaries and test harnesses embedding the
/// engine; the library itself only emits events.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
