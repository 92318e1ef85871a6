//! Structured logging for simulation debugging
//!
//! Everything in the workspace logs through `tracing`. This module only wires
//! a subscriber and offers a few spans with consistent field names.
//!
//! # Controlling output
//!
//! ```rust,no_run
//! use des_core::init_simulation_logging_with_level;
//! init_simulation_logging_with_level("debug");
//! ```
//!
//! `RUST_LOG` always wins over the level passed in code:
//!
//! ```bash
//! RUST_LOG=des_resources::passive=trace cargo test
//! ```
//!
//! # Level guidelines
//! - **TRACE**: scheduler internals, observer fan-out, no-op timeouts
//! - **DEBUG**: acquire / release / wait / resume decisions, shutdown bypasses
//! - **INFO**: run start and end
//! - **WARN**: modelled failures (resource timeouts)

use tracing::{info, Span};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging at `info`.
pub fn init_simulation_logging() {
    init_simulation_logging_with_level("info")
}

/// Initialize logging with a specific level: "trace", "debug", "info", "warn" or "error".
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_simulation_logging_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("{level},des_core={level},des_resources={level}").into());

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter)
        .try_init()
        .is_ok();

    if installed {
        info!("Simulation logging initialized at level: {}", level);
    }
}

/// Pretty-printed output of everything, for stepping through a single run.
pub fn init_detailed_simulation_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "trace,des_core=trace,des_resources=trace".into());

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_file(true)
                .with_line_number(true)
                .pretty(),
        )
        .with(filter)
        .try_init()
        .is_ok();

    if installed {
        info!("Detailed simulation logging initialized");
    }
}

pub fn simulation_span(name: &str) -> Span {
    tracing::info_span!("simulation", name = name)
}

/// Span for one step of a simulated process.
pub fn process_span(process_name: &str, process_id: &str) -> Span {
    tracing::debug_span!("process", name = process_name, id = process_id)
}

/// Span for operations on one passive resource.
pub fn resource_span(resource_name: &str, resource_id: &str) -> Span {
    tracing::debug_span!("resource", name = resource_name, id = resource_id)
}
