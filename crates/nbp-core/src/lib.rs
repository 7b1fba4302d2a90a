#![forbid(unsafe_code)]

//! Core: identity, awareness model, active-set diffing, and host traits.
//!
//! # Role in nbpresence
//! `nbp-core` is the data layer. It owns the normalized view of remote
//! collaborators, the shape of an awareness snapshot, and the pure functions
//! that turn a snapshot into the set of overlays a surface should show.
//!
//! # Primary responsibilities
//! - **Identity**: name/color/initials derivation from raw awareness payloads.
//! - **Awareness model**: client ids, cursor states, relative and absolute positions.
//! - **Snapshot builders**: snapshot + resolver -> keyed render requests.
//! - **Diff engine**: previous vs current active-set keys.
//! - **Host traits**: the awareness channel, position resolution, editor layout,
//!   and the DOM abstraction that the widgets drive.
//!
//! # How it fits in the system
//! The runtime (`nbp-runtime`) schedules frames and timers around these
//! primitives, and the widgets (`nbp-widgets`) reconcile overlay elements
//! against the keyed requests produced here. Nothing in this crate touches a
//! real DOM, so every rule can be tested natively.

pub mod awareness;
pub mod diff;
pub mod error;
pub mod geometry;
pub mod host;
pub mod identity;
pub mod key;
pub mod logging;
pub mod snapshot;

pub use awareness::{
    AbsolutePosition, Awareness, AwarenessChange, AwarenessSnapshot, ClientId, ContainerId,
    CursorState, EditorLayout, ListenerId, PeerState, PositionResolver, RelativePosition,
};
pub use diff::{KeyDiff, diff};
pub use error::{HostError, PresenceError};
pub use geometry::{Point, Rect, Size};
pub use host::{ElementId, ElementSpec, Mount, OverlayHost};
pub use identity::{NamePolicy, RawUser, RemoteUser};
pub use key::ActiveSetKey;
pub use snapshot::{ContainerScope, ScopedRequest};

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, trace, warn};
