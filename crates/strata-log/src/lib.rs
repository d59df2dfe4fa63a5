//! Structured logging for the Strata generation stack.
//!
//! Console output via the `tracing` ecosystem: timestamps, module targets,
//! and severity levels, filterable per subsystem through `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// The filter is taken from `RUST_LOG` when set, otherwise from `filter`,
/// otherwise `"info"`. Repeated initialization (common under test harnesses
/// that share a process) is ignored.
///
/// # Examples
///
/// ```no_run
/// strata_log::init_logging(None);
/// strata_log::init_logging(Some("info,strata_cluster=debug"));
/// ```
pub fn init_logging(filter: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter.unwrap_or("info")));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}

/// The filter used when neither `RUST_LOG` nor an explicit filter is given.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new("info")
}
