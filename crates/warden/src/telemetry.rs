//! Tracing subscriber setup for embedders.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::error::{Result, WardenError};

/// Installs a global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `filter` (usually
/// `logging.filter` from the configuration) is used.
///
/// # Errors
///
/// Fails if `filter` does not parse or a global subscriber is already
/// installed.
pub fn init_tracing(filter: &str) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => EnvFilter::try_new(filter)
            .map_err(|e| WardenError::Validation(format!("invalid log filter {filter:?}: {e}")))?,
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(env_filter)
        .try_init()
        .map_err(|e| WardenError::system(format!("tracing already initialized: {e}")))
}
