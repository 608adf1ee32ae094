use tracing_subscriber::EnvFilter;

/// Default directives when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,quarry=debug";

/// Install a `fmt` subscriber filtered by `RUST_LOG` (or [`DEFAULT_FILTER`]).
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Install a `fmt` subscriber with explicit filter directives.
pub fn init_tracing_with(directives: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directives))
        .try_init();
}
