//! Tracing subscriber setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "recog=info";
const VERBOSE_FILTER: &str = "recog=debug";

fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Initialize human-readable logging.
///
/// `RUST_LOG` is honored unless `verbose` is set. Returns `false` if a global
/// subscriber was already installed.
pub fn init_tracing(verbose: bool) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

/// Initialize JSON-formatted logging for log shippers
pub fn init_tracing_json() -> bool {
    tracing_subscriber::registry()
        .with(env_filter(false))
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
        .is_ok()
}
