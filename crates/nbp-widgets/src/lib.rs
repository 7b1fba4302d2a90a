#![forbid(unsafe_code)]

//! Presence surfaces for notebook editors.
//!
//! Each surface is a [`Projection`]: it turns an awareness snapshot into a
//! keyed set of render requests and knows how to draw one request into an
//! overlay element. The generic [`Reconciler`] keeps those elements in step
//! with the keyed set across passes, and [`PresenceWidget`] binds a
//! reconciler to an awareness channel with frame coalescing and disposal.
//!
//! # Surfaces
//!
//! | Surface | Keyed by | Mounted on |
//! |---------|----------|------------|
//! | [`RosterProjection`] | client | toolbar |
//! | [`CellIndicatorProjection`] | client + cell | the cell element |
//! | [`CursorLabelProjection`] | client + editor | document body |
//!
//! Hovering any presence element opens the single page-wide modal owned by
//! [`ModalController`]. [`PresenceHub`] wires all of it together per panel.

mod avatar;
pub mod cell_indicator;
pub mod cursor_label;
pub mod hub;
pub mod modal;
pub mod placement;
pub mod projection;
pub mod reconciler;
pub mod roster;
pub mod widget;

pub use cell_indicator::CellIndicatorProjection;
pub use cursor_label::CursorLabelProjection;
pub use hub::{PanelId, PresenceHub};
pub use modal::{ModalContent, ModalController, ModalKey, ModalStats, ModalTarget, WidgetId};
pub use placement::{Anchored, Placement};
pub use projection::{PassReport, Projection, RenderOutcome};
pub use reconciler::{Reconciler, ReconcilerOptions};
pub use roster::{OVERFLOW_CHIP, RosterProjection};
pub use widget::{PresenceSurface, PresenceWidget};
