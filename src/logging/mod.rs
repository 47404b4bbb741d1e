//! Tracing setup.
//!
//! Call [`initialize`] once at startup. Console output is filtered by `RUST_LOG` (defaulting
//! to `info`) and rendered by [`ProductionLogFormat`]:
//!
//! ```text
//! INFO  ballast::lifecycle::registry: Starting 2 managed component(s)...
//! DEBUG ballast::admin: Executing task 'invalidate-auth-cache'... [http_request{app="BALLAST" http.method=POST http.url=/tasks/invalidate-auth-cache}]
//! ```

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

mod production;

pub use production::ProductionLogFormat;

const DEFAULT_FILTER: &str = "info";

/// Installs the global tracing subscriber.
///
/// Fails if a global subscriber has already been installed.
pub fn initialize() -> anyhow::Result<()> {
    Registry::default()
        .with(console_layer())
        .try_init()
        .context("Failed to install the tracing subscriber")?;

    tracing::info!(
        "Tracing initialized for {} ({})",
        crate::APP_NAME.as_str(),
        crate::APP_VERSION.as_str()
    );
    Ok(())
}

fn console_layer() -> Box<dyn Layer<Registry> + Send + Sync + 'static> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .event_format(ProductionLogFormat)
        .with_filter(filter)
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initializing_twice_is_an_error() {
        // Another test may have won the race for the global subscriber already.
        let _ = initialize();

        assert!(initialize().is_err());
    }
}
