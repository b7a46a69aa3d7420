//! Tracing subscriber setup.

use reciva_core::Config;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. Production gets JSON lines for log
/// shipping; everywhere else gets the human-readable format. `RUST_LOG`
/// overrides the default `info` filter.
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if config.is_production() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
