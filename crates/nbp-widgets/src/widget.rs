#![forbid(unsafe_code)]

//! One independently registrable presence widget.
//!
//! A [`PresenceWidget`] binds a [`Projection`] to an awareness channel. It
//! owns its awareness subscription, its frame scheduler, and (through its
//! reconciler) every element and timer it creates.
//!
//! # Lifecycle
//!
//! ```text
//!   new ──► notify* ──► animation_frame ──► notify* ──► ... ──► dispose
//!            (coalesced)    (one pass)
//! ```
//!
//! [`dispose`](PresenceWidget::dispose) is unconditional and idempotent: it
//! unsubscribes, drops pending frames, removes every element (including a
//! modal the widget owns), and clears every timer. Dropping a widget
//! disposes it.

use core::time::Duration;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use nbp_core::{ActiveSetKey, Awareness, AwarenessChange, ElementId, ListenerId, OverlayHost};
use nbp_runtime::{DirtyReasons, FrameScheduler};

use crate::modal::{ModalContent, ModalController, ModalKey, ModalTarget, WidgetId};
use crate::projection::{PassReport, Projection};
use crate::reconciler::{Reconciler, ReconcilerOptions};

/// Object-safe view of a widget, used by the composition root to drive
/// heterogeneous surfaces.
pub trait PresenceSurface {
    fn id(&self) -> WidgetId;

    /// Record a change. Returns `true` when a new animation frame is needed.
    fn notify(&mut self, reasons: DirtyReasons) -> bool;

    fn is_frame_pending(&self) -> bool;

    /// Run the pending reconciliation pass, if any.
    fn animation_frame(&mut self, now: Duration) -> Option<PassReport>;

    /// Advance timers. Returns the keys hidden by decay.
    fn tick(&mut self, now: Duration) -> Vec<ActiveSetKey>;

    /// Pointer enter/leave. Returns `true` if `element` belongs to this widget.
    fn hover(&mut self, element: ElementId, entered: bool, now: Duration) -> bool;

    /// The pointer entered (`held`) or left the modal describing `key`. The
    /// overlay stays pinned while its modal is hovered.
    fn hold(&mut self, key: &ActiveSetKey, held: bool, now: Duration);

    fn next_deadline(&self) -> Option<Duration>;

    fn dispose(&mut self);

    fn is_disposed(&self) -> bool;
}

pub struct PresenceWidget<P: Projection, H: OverlayHost> {
    id: WidgetId,
    awareness: Rc<dyn Awareness>,
    listener: Option<ListenerId>,
    frames: Rc<FrameScheduler>,
    reconciler: Reconciler<P, H>,
    modal: Rc<RefCell<ModalController<H>>>,
    disposed: bool,
}

impl<P: Projection, H: OverlayHost> std::fmt::Debug for PresenceWidget<P, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceWidget")
            .field("id", &self.id)
            .field("reconciler", &self.reconciler)
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl<P: Projection, H: OverlayHost> PresenceWidget<P, H> {
    /// Subscribe to `awareness` and schedule the initial pass.
    pub fn new(
        id: WidgetId,
        awareness: Rc<dyn Awareness>,
        host: Rc<H>,
        projection: P,
        modal: Rc<RefCell<ModalController<H>>>,
        options: ReconcilerOptions,
    ) -> Self {
        let frames = Rc::new(FrameScheduler::new());
        let weak: Weak<FrameScheduler> = Rc::downgrade(&frames);
        let listener = awareness.subscribe(Rc::new(move |change: &AwarenessChange| {
            if let Some(frames) = weak.upgrade()
                && !change.is_empty()
            {
                frames.request(DirtyReasons::AWARENESS);
            }
        }));
        frames.request(DirtyReasons::FORCED);
        tracing::debug!(widget = %id, surface = projection.name(), "widget registered");
        Self {
            id,
            awareness,
            listener: Some(listener),
            frames,
            reconciler: Reconciler::new(host, projection, options),
            modal,
            disposed: false,
        }
    }

    pub fn reconciler(&self) -> &Reconciler<P, H> {
        &self.reconciler
    }

    pub fn projection(&self) -> &P {
        self.reconciler.projection()
    }

    /// Mutable access to the projection. Callers that change what the
    /// projection collects should follow up with [`notify`](Self::notify).
    pub fn projection_mut(&mut self) -> &mut P {
        self.reconciler.projection_mut()
    }

    pub fn frames(&self) -> &FrameScheduler {
        &self.frames
    }

    fn show_modal(&self, target: ModalTarget, anchor: ElementId, content: &ModalContent) {
        if let Err(err) = self.modal.borrow_mut().show(target, anchor, content) {
            tracing::debug!(widget = %self.id, error = %err, "modal not shown");
        }
    }

    fn leave_modal(&self, target: &ModalTarget, now: Duration) {
        let mut modal = self.modal.borrow_mut();
        if modal.target() == Some(target) {
            modal.schedule_hide(now);
        }
    }
}

impl<P: Projection, H: OverlayHost> PresenceSurface for PresenceWidget<P, H> {
    fn id(&self) -> WidgetId {
        self.id
    }

    fn notify(&mut self, reasons: DirtyReasons) -> bool {
        if self.disposed {
            return false;
        }
        self.frames.request(reasons)
    }

    fn is_frame_pending(&self) -> bool {
        !self.disposed && self.frames.is_frame_pending()
    }

    fn animation_frame(&mut self, now: Duration) -> Option<PassReport> {
        if self.disposed {
            return None;
        }
        let reasons = self.frames.begin_frame()?;
        tracing::trace!(widget = %self.id, ?reasons, "animation frame");
        let report = self.reconciler.pass(now);
        self.modal.borrow_mut().dismiss_detached(self.id);
        Some(report)
    }

    fn tick(&mut self, now: Duration) -> Vec<ActiveSetKey> {
        if self.disposed {
            return Vec::new();
        }
        self.reconciler.tick(now)
    }

    fn hover(&mut self, element: ElementId, entered: bool, now: Duration) -> bool {
        if self.disposed {
            return false;
        }
        if let Some(key) = self.reconciler.key_for(element).cloned() {
            let target = ModalTarget::new(self.id, ModalKey::Overlay(key.clone()));
            if entered {
                self.reconciler.pin(&key);
                let content = self
                    .reconciler
                    .request_for(&key)
                    .map(|request| self.reconciler.projection().modal_content(&key, request));
                if let Some(content) = content {
                    self.show_modal(target, element, &content);
                }
            } else {
                self.reconciler.unpin(&key, now);
                self.leave_modal(&target, now);
            }
            return true;
        }
        if let Some((key, content)) = self.reconciler.projection().chrome_hover(element) {
            let target = ModalTarget::new(self.id, key);
            if entered {
                self.show_modal(target, element, &content);
            } else {
                self.leave_modal(&target, now);
            }
            return true;
        }
        false
    }

    fn hold(&mut self, key: &ActiveSetKey, held: bool, now: Duration) {
        if self.disposed {
            return;
        }
        if held {
            self.reconciler.pin(key);
        } else {
            self.reconciler.unpin(key, now);
        }
    }

    fn next_deadline(&self) -> Option<Duration> {
        if self.disposed {
            return None;
        }
        self.reconciler.next_deadline()
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let Some(listener) = self.listener.take() {
            self.awareness.unsubscribe(listener);
        }
        self.frames.cancel();
        self.reconciler.clear();
        match self.modal.try_borrow_mut() {
            Ok(mut modal) => {
                modal.dismiss_widget(self.id);
            }
            Err(_) => tracing::warn!(widget = %self.id, "modal busy during dispose"),
        }
        tracing::debug!(
            widget = %self.id,
            surface = self.reconciler.projection().name(),
            "widget disposed"
        );
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl<P: Projection, H: OverlayHost> Drop for PresenceWidget<P, H> {
    fn drop(&mut self) {
        self.dispose();
    }
}
