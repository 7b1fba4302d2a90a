#![forbid(unsafe_code)]

//! Browser bridge for nbpresence.
//!
//! This crate provides `PresenceRunner`, a `wasm-bindgen`-exported struct
//! that wraps a presence hub for one notebook panel and exposes it to
//! JavaScript for host-driven execution. The page owns the collaboration
//! session and forwards awareness states as JSON (see [`input`]).
//!
//! [`RunnerCore`] holds everything that does not touch JS types and is
//! tested natively against the in-memory DOM.

pub mod input;
mod runner_core;

#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use dom::DomHost;
#[cfg(target_arch = "wasm32")]
pub use wasm::PresenceRunner;

pub use input::{AwarenessUpdate, parse_awareness, position_token};
pub use runner_core::RunnerCore;
