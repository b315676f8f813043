use ads_core::Environment;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Install the global subscriber: JSON in production, compact text
/// otherwise. `RUST_LOG` overrides the default `info` filter. Repeated calls
/// are ignored.
pub fn init_tracing(environment: Environment) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let result = if environment.is_production() {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().json().with_target(false).flatten_event(true))
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().compact().with_target(false))
            .with(filter)
            .try_init()
    };
    if result.is_ok() {
        tracing::info!(?environment, "tracing initialized");
    }
}
