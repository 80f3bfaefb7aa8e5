//! Logging setup
//!
//! Installs a `tracing` fmt subscriber writing to stderr so estimates on
//! stdout stay clean. `RUST_LOG` overrides the level chosen here.

use tracing_subscriber::{EnvFilter, FmtSubscriber};
use crate::{MontePiError, Result};

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "montepi=debug"
    } else {
        "montepi=warn"
    }
}

/// Install the global subscriber
pub fn init(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| MontePiError::ConfigError(format!("Failed to initialise logging: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(true), "montepi=debug");
        assert_eq!(default_filter(false), "montepi=warn");
    }

    #[test]
    fn test_init_only_once() {
        // First install may race with other tests; the second always fails
        let _ = init(false);
        assert!(matches!(init(false), Err(MontePiError::ConfigError(_))));
    }
}
