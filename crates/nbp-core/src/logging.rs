#![forbid(unsafe_code)]

//! Logging helpers.
//!
//! With the `tracing` feature the usual macros are re-exported so downstream
//! crates can log through `nbp_core::debug!` without naming `tracing`
//! themselves. `tracing-json` adds a one-call JSON subscriber setup for native
//! hosts (test runners, recorders); the browser host installs nothing and
//! events are simply dropped.

#[cfg(feature = "tracing")]
pub use tracing::{debug, trace, warn};

/// Install a global JSON subscriber filtered by `RUST_LOG`.
///
/// Falls back to `nbp=info` when `RUST_LOG` is unset. Fails if a global
/// subscriber is already installed.
#[cfg(feature = "tracing-json")]
pub fn init_json_logging() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nbp=info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(false)
        .try_init()
}
