use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber. `RUST_LOG` overrides the default `info` filter.
pub fn init() {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

	// A subscriber may already be installed, e.g. by a test harness.
	let _ = fmt()
		.with_env_filter(filter)
		.with_target(false)
		.try_init();
}
