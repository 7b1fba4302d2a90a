#![forbid(unsafe_code)]

//! Platform-independent runner core.
//!
//! This module contains the logic shared between the wasm-bindgen exports
//! and the native test harness. No JS/WASM types here.
//!
//! One runner drives the presence surfaces of one notebook panel: the
//! toolbar roster, the cell indicators, and one cursor-label widget per
//! attached editor. The host feeds it awareness payloads and editor events,
//! and calls [`RunnerCore::animation_frame`] from `requestAnimationFrame` and
//! [`RunnerCore::advance_time`] whenever [`RunnerCore::next_wakeup_ms`] is due.

use core::time::Duration;
use std::rc::Rc;

use nbp_core::{
    Awareness, ClientId, ContainerId, EditorLayout, ElementId, OverlayHost, PositionResolver,
    PresenceError,
};
use nbp_runtime::{
    Clock, DeterministicClock, DirtyReasons, MemoryAwareness, PresenceConfig, duration_from_ms,
};
use nbp_widgets::{PanelId, PassReport, PresenceHub, WidgetId};

use crate::input::parse_awareness;

const PANEL: PanelId = PanelId(1);

/// Platform-independent presence runner for one notebook panel.
pub struct RunnerCore<H: OverlayHost> {
    awareness: Rc<MemoryAwareness>,
    resolver: Rc<dyn PositionResolver>,
    hub: PresenceHub<H>,
    clock: DeterministicClock,
    disposed: bool,
}

impl<H: OverlayHost + 'static> RunnerCore<H> {
    /// Create a runner and register the panel-wide surfaces.
    ///
    /// Cells are empty until [`set_cells`](Self::set_cells) is called.
    pub fn new(
        host: Rc<H>,
        local: ClientId,
        resolver: Rc<dyn PositionResolver>,
        config: PresenceConfig,
    ) -> Self {
        let awareness = Rc::new(MemoryAwareness::new(local));
        let mut hub = PresenceHub::new(host, config);
        hub.register_roster(PANEL, awareness.clone());
        hub.register_cells(
            PANEL,
            awareness.clone(),
            Rc::clone(&resolver),
            std::iter::empty(),
        );
        tracing::debug!(local = local.get(), "presence runner created");
        Self {
            awareness,
            resolver,
            hub,
            clock: DeterministicClock::new(),
            disposed: false,
        }
    }

    fn ensure_live(&self) -> Result<(), PresenceError> {
        if self.disposed {
            return Err(PresenceError::Disposed);
        }
        Ok(())
    }

    /// Move the clock to a host timestamp. Invalid timestamps (NaN,
    /// negative, infinite) and backwards jumps keep the current time.
    fn observe(&mut self, now_ms: f64) -> Duration {
        match duration_from_ms(now_ms) {
            Some(now) => self.clock.set(now),
            None => tracing::warn!(now_ms, "ignoring invalid host timestamp"),
        }
        self.clock.now_mono()
    }

    pub fn now(&self) -> Duration {
        self.clock.now_mono()
    }

    /// Replace the awareness states with a parsed `getStates()` payload.
    ///
    /// Returns whether the payload changed any state and so needs a frame.
    /// A malformed payload leaves the previous states untouched.
    pub fn push_awareness_json(&mut self, json: &str) -> Result<bool, PresenceError> {
        self.ensure_live()?;
        let update = parse_awareness(json).inspect_err(|err| {
            tracing::warn!(error = %err, "awareness payload rejected");
        })?;
        let local = self.awareness.local_client_id();
        if let Some(claimed) = update.local
            && claimed != local
        {
            return Err(PresenceError::malformed(
                Some(claimed),
                format!("payload is for local client {claimed}, runner is {local}"),
            ));
        }
        let change = self.awareness.replace_all(update.states);
        tracing::trace!(
            added = change.added.len(),
            updated = change.updated.len(),
            removed = change.removed.len(),
            "awareness replaced"
        );
        Ok(!change.is_empty() && self.hub.is_frame_pending())
    }

    /// The notebook's cell collection changed.
    pub fn set_cells<I, S>(&mut self, cells: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<ContainerId>,
    {
        if self.disposed {
            return false;
        }
        self.hub.set_cells(PANEL, cells.into_iter().map(Into::into))
    }

    /// Start cursor labels for an editor. Re-attaching the same container
    /// replaces the previous editor.
    pub fn attach_editor(
        &mut self,
        editor: Rc<dyn EditorLayout>,
    ) -> Result<WidgetId, PresenceError> {
        self.ensure_live()?;
        Ok(self.hub.register_label(
            PANEL,
            self.awareness.clone(),
            Rc::clone(&self.resolver),
            editor,
        ))
    }

    /// Dispose the cursor labels of a destroyed editor.
    pub fn detach_editor(&mut self, container: &str) -> bool {
        self.hub
            .unregister_label(PANEL, &ContainerId::new(container))
    }

    /// Document, selection, or viewport of an editor changed.
    pub fn notify_editor(&mut self, container: &str, reasons: DirtyReasons) -> bool {
        if self.disposed {
            return false;
        }
        self.hub
            .notify_editor(PANEL, &ContainerId::new(container), reasons)
    }

    /// Something moved every overlay at once (window resize, panel layout).
    pub fn notify_layout(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.hub.notify_panel(PANEL, DirtyReasons::VIEWPORT)
    }

    /// Run pending passes. Call from `requestAnimationFrame`.
    pub fn animation_frame(&mut self, now_ms: f64) -> Vec<(WidgetId, PassReport)> {
        if self.disposed {
            return Vec::new();
        }
        let now = self.observe(now_ms);
        let reports = self.hub.animation_frame(now);
        for (widget, report) in &reports {
            if report.degraded {
                tracing::warn!(%widget, "presence pass degraded to empty");
            }
        }
        reports
    }

    /// Fire due decay and modal timers. Returns whether anything changed.
    pub fn advance_time(&mut self, now_ms: f64) -> bool {
        if self.disposed {
            return false;
        }
        let now = self.observe(now_ms);
        self.hub.tick(now)
    }

    /// Pointer entered or left a presence element.
    pub fn pointer(&mut self, element: u64, entered: bool, now_ms: f64) -> bool {
        if self.disposed {
            return false;
        }
        let now = self.observe(now_ms);
        self.hub.hover(ElementId::new(element), entered, now)
    }

    pub fn is_frame_pending(&self) -> bool {
        !self.disposed && self.hub.is_frame_pending()
    }

    /// Host timestamp at which [`advance_time`](Self::advance_time) should
    /// next be called.
    pub fn next_wakeup_ms(&self) -> Option<f64> {
        if self.disposed {
            return None;
        }
        self.hub
            .next_deadline()
            .map(|deadline| deadline.as_secs_f64() * 1000.0)
    }

    /// Remove every element, timer, and subscription. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.hub.dispose_all();
        tracing::debug!("presence runner disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn hub(&self) -> &PresenceHub<H> {
        &self.hub
    }

    pub fn awareness(&self) -> &Rc<MemoryAwareness> {
        &self.awareness
    }
}
