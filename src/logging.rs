use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LedgerConfig;

/// Installs the global subscriber. Logs go to stderr so stdout stays free
/// for CSV output. `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LedgerConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.log_json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
