// Logging setup
// Installs the tracing subscriber used by binaries and tests embedding this crate

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "promo_rules=info";

/// Initialize the global tracing subscriber
///
/// Honours `RUST_LOG`; falls back to `promo_rules=info`. Calling this more
/// than once keeps the first subscriber.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("Tracing subscriber installed");
    }
}
