#![forbid(unsafe_code)]

//! nbpresence runtime
//!
//! Scheduling and state-machine pieces that sit between the awareness channel
//! and the overlay widgets.
//!
//! # Key Components
//!
//! - [`FrameScheduler`] - Collapses bursts of notifications into one pass per animation frame
//! - [`DecayScheduler`] - Per-key `Visible` / `FadingOut` / `Hidden` label lifecycle
//! - [`PresenceConfig`] - Tunables, optionally loaded from TOML or JSON
//! - [`MemoryAwareness`] - Host-fed awareness store implementing [`nbp_core::Awareness`]
//! - [`DeterministicClock`] / [`WebClock`] - Monotonic time sources
//!
//! # Role in nbpresence
//! Everything here is single-threaded and non-blocking. The host advances
//! time explicitly and calls back on animation frames; the runtime only keeps
//! the bookkeeping that decides *when* a reconciliation pass or a fade-out
//! should happen.

pub mod awareness_store;
pub mod clock;
pub mod config;
pub mod decay;
pub mod frame;

pub use awareness_store::MemoryAwareness;
pub use clock::{Clock, DeterministicClock, WebClock, duration_from_ms};
pub use config::{ConfigError, PresenceConfig};
pub use decay::{DecayScheduler, DecayTransition, LabelPhase};
pub use frame::{DirtyReasons, FrameScheduler};
