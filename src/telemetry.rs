//! Tracing subscriber setup.
//!
//! `RUST_LOG` drives the filter (default `deal_aggregator=info,warn`).
//! `LOG_FORMAT=json` switches to JSON lines; otherwise compact text.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_FILTER: &str = "deal_aggregator=info,warn";

/// Install the global subscriber. A second call (or one made after another
/// subscriber was installed, e.g. by the deployment runtime) is a no-op.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };

    if res.is_ok() {
        tracing::debug!(json, "tracing initialized");
    }
}
