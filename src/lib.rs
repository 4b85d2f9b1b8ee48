//! Careguard: the safety-critical core of a multi-tenant healthcare
//! records platform.
//!
//! Two subsystems share this crate because they share a risk profile:
//! tenant- and physician-scoped patient access control (fail-closed), and
//! the clinical rule engine that screens proposed prescriptions against a
//! patient's medications, allergies, and dosing constraints (fail-open for
//! availability, with every finding audited). The coordinator binds them
//! into the single propose-prescription decision.
//!
//! The crate is a library invoked in-process; it owns no HTTP surface.
//! Patient facts and rule content arrive through the `gateway` traits,
//! which callers implement against their own services.

pub mod access;
pub mod audit;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod engine;
pub mod gateway;
pub mod models;
pub mod throttle;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for a host binary. Call once at startup; honors
/// RUST_LOG and falls back to the crate default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} core v{}", config::CORE_NAME, config::CORE_VERSION);
}
