#![forbid(unsafe_code)]

//! Test fixtures for nbpresence.
//!
//! - [`FakeDom`] - recording in-memory [`nbp_core::OverlayHost`]
//! - [`StaticResolver`] - table-driven position resolution
//! - [`FakeEditor`] - monospace editor layout with lookup recording
//! - [`fixtures`] - peer-state builders

pub mod dom;
pub mod editor;
pub mod fixtures;
pub mod resolver;

pub use dom::{DEFAULT_SIZE, FakeDom, FakeNode};
pub use editor::FakeEditor;
pub use fixtures::{anonymous_at, caret, client, named, named_at};
pub use resolver::StaticResolver;
