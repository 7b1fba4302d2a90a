#![forbid(unsafe_code)]

//! The capability interface a presence surface plugs into the reconciler.
//!
//! The roster, the cell indicators, and the cursor labels share one pipeline
//! (snapshot, diff, create/update/remove, decay). They differ only in how
//! they derive their keyed requests, where an overlay is attached, and how
//! it is drawn. Those three decisions are the [`Projection`] trait.

use core::time::Duration;
use std::collections::BTreeMap;

use nbp_core::{ActiveSetKey, ElementId, HostError, Mount, OverlayHost, PresenceError};

use crate::modal::{ModalContent, ModalKey};

/// Result of drawing one overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Content and position are current.
    Rendered,
    /// The host has no layout for this overlay right now. An existing element
    /// keeps its last state; a new one is not created.
    LayoutUnavailable,
}

/// What one reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    /// Keys skipped this pass (no layout, or mount point missing).
    pub deferred: usize,
    /// Elements removed after staying without layout for too long.
    pub evicted: usize,
    /// `collect` failed and the pass rendered the empty set.
    pub degraded: bool,
    /// Keys that lost their element this pass (removed or evicted).
    pub gone: Vec<ActiveSetKey>,
    /// Overlays live after the pass.
    pub live: usize,
}

impl PassReport {
    /// Whether the pass changed nothing on the page.
    pub fn is_quiet(&self) -> bool {
        self.created == 0 && self.removed == 0 && self.evicted == 0
    }
}

/// One presence surface.
pub trait Projection {
    /// Per-key render request.
    type Request: Clone;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Derive the active set for this pass.
    fn collect(&mut self) -> Result<BTreeMap<ActiveSetKey, Self::Request>, PresenceError>;

    /// Where the overlay for `key` is attached.
    fn mount(&self, key: &ActiveSetKey, request: &Self::Request) -> Mount;

    /// Create the (detached) element subtree for a new key.
    fn render(
        &mut self,
        host: &dyn OverlayHost,
        key: &ActiveSetKey,
        request: &Self::Request,
    ) -> Result<ElementId, HostError>;

    /// Bring an attached element up to date, in place.
    fn update(
        &mut self,
        host: &dyn OverlayHost,
        element: ElementId,
        key: &ActiveSetKey,
        request: &Self::Request,
    ) -> Result<RenderOutcome, HostError>;

    /// Idle interval after which overlays hide. `None` disables decay.
    fn decay_interval(&self) -> Option<Duration> {
        None
    }

    /// Modal shown while an overlay is hovered.
    fn modal_content(&self, key: &ActiveSetKey, request: &Self::Request) -> ModalContent;

    /// Called after every pass, with the pass report.
    fn finish_pass(
        &mut self,
        _host: &dyn OverlayHost,
        _report: &PassReport,
    ) -> Result<(), HostError> {
        Ok(())
    }

    /// Hover on a surface element that is not an overlay.
    fn chrome_hover(&self, _element: ElementId) -> Option<(ModalKey, ModalContent)> {
        None
    }

    /// Release surface-owned elements that are not overlays.
    fn teardown(&mut self, _host: &dyn OverlayHost) {}
}
