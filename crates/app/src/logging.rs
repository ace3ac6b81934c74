//! Tracing setup for the `quiz` binary.
//!
//! Logs go to stderr so they never interleave with the quiz transcript on
//! stdout. `RUST_LOG` overrides the default filter.

use std::io;

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Level used for the quiz crates when `RUST_LOG` is unset.
pub const DEFAULT_LEVEL: Level = Level::WARN;

/// Installs the global subscriber. Call once at startup.
pub fn init_logging(level: Level) {
    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time();

    tracing_subscriber::registry()
        .with(build_env_filter(level))
        .with(layer)
        .init();
}

fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

// sqlx stays at warn regardless of our level.
fn default_directives(level: Level) -> String {
    format!(
        "warn,app={level},services={level},storage={level},quiz_core={level}",
        level = level.as_str().to_lowercase()
    )
}
