#![forbid(unsafe_code)]

//! Animation-frame coalescing.
//!
//! Awareness updates and editor view updates can arrive many times per
//! frame during active multi-user editing. [`FrameScheduler`] turns any burst
//! of notifications into a single reconciliation pass:
//!
//! 1. Each notification calls [`FrameScheduler::request`] with its reasons.
//! 2. Only the first request since the last frame returns `true`; the caller
//!    then asks the host for one animation frame.
//! 3. On the frame, [`FrameScheduler::begin_frame`] drains the accumulated
//!    reasons and the pass runs against the *latest* state.
//!
//! Uses `Cell` so awareness listeners can hold an `Rc<FrameScheduler>` and
//! request frames through a shared reference. Not thread-safe.

use std::cell::Cell;

use bitflags::bitflags;

bitflags! {
    /// Why a reconciliation pass was requested.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DirtyReasons: u8 {
        /// Awareness states changed.
        const AWARENESS = 1 << 0;
        /// Editor document content changed.
        const DOCUMENT  = 1 << 1;
        /// Editor selection changed.
        const SELECTION = 1 << 2;
        /// Editor viewport scrolled or resized.
        const VIEWPORT  = 1 << 3;
        /// Notebook cells were added, removed, or moved.
        const CELLS     = 1 << 4;
        /// Explicit full refresh (attach, config change).
        const FORCED    = 1 << 5;
    }
}

impl DirtyReasons {
    /// Reasons produced by editor view updates.
    pub const EDITOR_VIEW: Self = Self::DOCUMENT
        .union(Self::SELECTION)
        .union(Self::VIEWPORT);
}

/// Collapses notification bursts into one pass per frame.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    pending: Cell<DirtyReasons>,
    frame_requested: Cell<bool>,
    requests: Cell<u64>,
    frames: Cell<u64>,
}

impl FrameScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a notification.
    ///
    /// Returns `true` when the caller must schedule an animation frame,
    /// `false` when one is already scheduled (or `reasons` is empty).
    pub fn request(&self, reasons: DirtyReasons) -> bool {
        if reasons.is_empty() {
            return false;
        }
        self.requests.set(self.requests.get().saturating_add(1));
        self.pending.set(self.pending.get() | reasons);
        if self.frame_requested.get() {
            return false;
        }
        self.frame_requested.set(true);
        true
    }

    /// Start a frame. Returns the accumulated reasons, or `None` if nothing
    /// was requested since the previous frame.
    pub fn begin_frame(&self) -> Option<DirtyReasons> {
        self.frame_requested.set(false);
        let reasons = self.pending.replace(DirtyReasons::empty());
        if reasons.is_empty() {
            return None;
        }
        self.frames.set(self.frames.get().saturating_add(1));
        Some(reasons)
    }

    /// Whether a frame is scheduled and not yet run.
    pub fn is_frame_pending(&self) -> bool {
        self.frame_requested.get()
    }

    /// Drop pending work without running it.
    pub fn cancel(&self) {
        self.frame_requested.set(false);
        self.pending.set(DirtyReasons::empty());
    }

    /// Total notifications recorded.
    pub fn requests(&self) -> u64 {
        self.requests.get()
    }

    /// Total frames that ran a pass.
    pub fn frames(&self) -> u64 {
        self.frames.get()
    }

    /// Notifications absorbed into an already-scheduled frame.
    pub fn coalesced(&self) -> u64 {
        self.requests.get().saturating_sub(self.frames.get())
    }
}
