#![forbid(unsafe_code)]

//! Keyed overlay reconciliation.
//!
//! A [`Reconciler`] owns every element its [`Projection`] creates. Each
//! [`pass`](Reconciler::pass) diffs the projection's current key set against
//! the overlays on the page and applies the difference:
//!
//! - **create**: render, lay out, attach, watch hover
//! - **update**: redraw in place (the element is never recreated)
//! - **remove**: detach, forget the element, clear the key's decay timer
//!
//! After a pass the tracked overlays correspond 1:1 to the active keys, with
//! one exception: an existing overlay whose update reports
//! [`RenderOutcome::LayoutUnavailable`] is kept as-is, optionally until it
//! has been without layout for `stale_layout_passes` consecutive passes.

use core::time::Duration;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use ahash::AHashMap;
use nbp_core::{ActiveSetKey, ElementId, OverlayHost, diff};
use nbp_runtime::{DecayScheduler, DecayTransition};

use crate::projection::{PassReport, Projection, RenderOutcome};

/// Reconciler tunables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcilerOptions {
    /// Evict an overlay after this many consecutive passes without layout.
    pub stale_layout_passes: Option<u32>,
}

#[derive(Debug)]
struct Overlay<R> {
    element: ElementId,
    request: R,
    stale_passes: u32,
}

/// Applies a projection's active set to the page.
pub struct Reconciler<P: Projection, H: OverlayHost> {
    host: Rc<H>,
    projection: P,
    overlays: BTreeMap<ActiveSetKey, Overlay<P::Request>>,
    by_element: AHashMap<ElementId, ActiveSetKey>,
    decay: Option<DecayScheduler<ActiveSetKey>>,
    options: ReconcilerOptions,
    passes: u64,
}

impl<P: Projection, H: OverlayHost> std::fmt::Debug for Reconciler<P, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("surface", &self.projection.name())
            .field("overlays", &self.overlays.len())
            .field("passes", &self.passes)
            .finish()
    }
}

impl<P: Projection, H: OverlayHost> Reconciler<P, H> {
    pub fn new(host: Rc<H>, projection: P, options: ReconcilerOptions) -> Self {
        let decay = projection.decay_interval().map(DecayScheduler::new);
        Self {
            host,
            projection,
            overlays: BTreeMap::new(),
            by_element: AHashMap::new(),
            decay,
            options,
            passes: 0,
        }
    }

    /// Run one reconciliation pass at `now`.
    pub fn pass(&mut self, now: Duration) -> PassReport {
        self.passes += 1;
        let mut report = PassReport::default();
        let requests = match self.projection.collect() {
            Ok(requests) => requests,
            Err(err) => {
                tracing::warn!(
                    surface = self.projection.name(),
                    error = %err,
                    "collect failed; rendering empty set"
                );
                report.degraded = true;
                BTreeMap::new()
            }
        };

        let previous: BTreeSet<ActiveSetKey> = self.overlays.keys().cloned().collect();
        let current: BTreeSet<ActiveSetKey> = requests.keys().cloned().collect();
        let changes = diff(&previous, &current);

        for key in &changes.to_remove {
            self.remove_key(key);
            report.removed += 1;
            report.gone.push(key.clone());
        }
        for key in &changes.to_update {
            if let Some(request) = requests.get(key) {
                self.update_key(key, request, now, &mut report);
            }
        }
        for key in &changes.to_create {
            if let Some(request) = requests.get(key) {
                self.create_key(key, request, now, &mut report);
            }
        }

        report.live = self.overlays.len();
        if let Err(err) = self.projection.finish_pass(&*self.host, &report) {
            tracing::warn!(surface = self.projection.name(), error = %err, "finish_pass failed");
        }

        if report.is_quiet() {
            tracing::trace!(
                surface = self.projection.name(),
                updated = report.updated,
                deferred = report.deferred,
                "reconciliation pass"
            );
        } else {
            tracing::debug!(
                surface = self.projection.name(),
                created = report.created,
                updated = report.updated,
                removed = report.removed,
                deferred = report.deferred,
                evicted = report.evicted,
                live = report.live,
                "reconciliation pass"
            );
        }
        report
    }

    fn create_key(
        &mut self,
        key: &ActiveSetKey,
        request: &P::Request,
        now: Duration,
        report: &mut PassReport,
    ) {
        let host: &dyn OverlayHost = &*self.host;
        let element = match self.projection.render(host, key, request) {
            Ok(element) => element,
            Err(err) => {
                tracing::debug!(
                    surface = self.projection.name(),
                    %key,
                    error = %err,
                    "render failed"
                );
                report.deferred += 1;
                return;
            }
        };
        match self.projection.update(host, element, key, request) {
            Ok(RenderOutcome::Rendered) => {}
            Ok(RenderOutcome::LayoutUnavailable) => {
                host.remove(element);
                report.deferred += 1;
                return;
            }
            Err(err) => {
                tracing::debug!(
                    surface = self.projection.name(),
                    %key,
                    error = %err,
                    "initial update failed"
                );
                host.remove(element);
                report.deferred += 1;
                return;
            }
        }
        let mount = self.projection.mount(key, request);
        if let Err(err) = host.attach(element, &mount) {
            tracing::debug!(
                surface = self.projection.name(),
                %key,
                error = %err,
                "mount unavailable"
            );
            host.remove(element);
            report.deferred += 1;
            return;
        }
        if let Err(err) = host.watch_hover(element) {
            tracing::debug!(
                surface = self.projection.name(),
                %key,
                error = %err,
                "hover not watched"
            );
        }

        self.by_element.insert(element, key.clone());
        self.overlays.insert(
            key.clone(),
            Overlay {
                element,
                request: request.clone(),
                stale_passes: 0,
            },
        );
        self.refresh_decay(key, element, now);
        report.created += 1;
    }

    fn update_key(
        &mut self,
        key: &ActiveSetKey,
        request: &P::Request,
        now: Duration,
        report: &mut PassReport,
    ) {
        let Some(overlay) = self.overlays.get_mut(key) else {
            return;
        };
        let element = overlay.element;
        if !self.host.is_attached(element) {
            tracing::debug!(surface = self.projection.name(), %key, "overlay detached");
            self.remount(key, request, now, report);
            return;
        }
        match self.projection.update(&*self.host, element, key, request) {
            Ok(RenderOutcome::Rendered) => {
                overlay.request = request.clone();
                overlay.stale_passes = 0;
                report.updated += 1;
                self.refresh_decay(key, element, now);
            }
            Ok(RenderOutcome::LayoutUnavailable) => {
                overlay.request = request.clone();
                overlay.stale_passes = overlay.stale_passes.saturating_add(1);
                let stale = overlay.stale_passes;
                match self.options.stale_layout_passes {
                    Some(limit) if stale >= limit => {
                        tracing::debug!(
                            surface = self.projection.name(),
                            %key,
                            stale,
                            "evicting overlay without layout"
                        );
                        self.remove_key(key);
                        report.evicted += 1;
                        report.gone.push(key.clone());
                    }
                    _ => report.deferred += 1,
                }
            }
            Err(err) => {
                tracing::debug!(
                    surface = self.projection.name(),
                    %key,
                    error = %err,
                    "update failed"
                );
                self.remount(key, request, now, report);
            }
        }
    }

    /// Replace an overlay whose element is unusable with a freshly mounted
    /// one. Counts as evicted only when the new mount fails too.
    fn remount(
        &mut self,
        key: &ActiveSetKey,
        request: &P::Request,
        now: Duration,
        report: &mut PassReport,
    ) {
        self.remove_key(key);
        self.create_key(key, request, now, report);
        if !self.overlays.contains_key(key) {
            tracing::warn!(surface = self.projection.name(), %key, "overlay dropped");
            report.evicted += 1;
            report.gone.push(key.clone());
        }
    }

    fn refresh_decay(&mut self, key: &ActiveSetKey, element: ElementId, now: Duration) {
        let Some(decay) = self.decay.as_mut() else {
            return;
        };
        if decay.touch(key, now) == DecayTransition::Shown
            && let Err(err) = self.host.set_visible(element, true)
        {
            tracing::debug!(%key, error = %err, "show failed");
        }
    }

    fn remove_key(&mut self, key: &ActiveSetKey) {
        if let Some(overlay) = self.overlays.remove(key) {
            self.by_element.remove(&overlay.element);
            self.host.remove(overlay.element);
        }
        if let Some(decay) = self.decay.as_mut() {
            decay.remove(key);
        }
    }

    /// Hide overlays whose decay deadline passed. Returns the hidden keys.
    pub fn tick(&mut self, now: Duration) -> Vec<ActiveSetKey> {
        let Some(decay) = self.decay.as_mut() else {
            return Vec::new();
        };
        let expired = decay.tick(now);
        for key in &expired {
            if let Some(overlay) = self.overlays.get(key)
                && let Err(err) = self.host.set_visible(overlay.element, false)
            {
                tracing::debug!(%key, error = %err, "hide failed");
            }
        }
        expired
    }

    /// Keep `key` visible while it is hovered.
    pub fn pin(&mut self, key: &ActiveSetKey) {
        let Some(decay) = self.decay.as_mut() else {
            return;
        };
        if decay.pin(key)
            && let Some(overlay) = self.overlays.get(key)
            && let Err(err) = self.host.set_visible(overlay.element, true)
        {
            tracing::debug!(%key, error = %err, "show failed");
        }
    }

    /// Resume decay for `key`.
    pub fn unpin(&mut self, key: &ActiveSetKey, now: Duration) {
        if let Some(decay) = self.decay.as_mut() {
            decay.unpin(key, now);
        }
    }

    /// Remove every overlay, timer, and surface element.
    pub fn clear(&mut self) {
        for (_, overlay) in std::mem::take(&mut self.overlays) {
            self.host.remove(overlay.element);
        }
        self.by_element.clear();
        if let Some(decay) = self.decay.as_mut() {
            decay.clear();
        }
        self.projection.teardown(&*self.host);
    }

    pub fn projection(&self) -> &P {
        &self.projection
    }

    pub fn projection_mut(&mut self) -> &mut P {
        &mut self.projection
    }

    pub fn host(&self) -> &Rc<H> {
        &self.host
    }

    pub fn key_for(&self, element: ElementId) -> Option<&ActiveSetKey> {
        self.by_element.get(&element)
    }

    pub fn element_for(&self, key: &ActiveSetKey) -> Option<ElementId> {
        self.overlays.get(key).map(|o| o.element)
    }

    /// Last request rendered (or retained) for `key`.
    pub fn request_for(&self, key: &ActiveSetKey) -> Option<&P::Request> {
        self.overlays.get(key).map(|o| &o.request)
    }

    /// Consecutive passes `key` has gone without layout.
    pub fn stale_passes(&self, key: &ActiveSetKey) -> Option<u32> {
        self.overlays.get(key).map(|o| o.stale_passes)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ActiveSetKey> {
        self.overlays.keys()
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    pub fn decay(&self) -> Option<&DecayScheduler<ActiveSetKey>> {
        self.decay.as_ref()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.decay.as_ref().and_then(DecayScheduler::next_deadline)
    }

    pub fn pending_timers(&self) -> usize {
        self.decay.as_ref().map_or(0, DecayScheduler::pending_timers)
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modal::ModalContent;
    use nbp_core::{ClientId, ElementSpec, HostError, Mount, PresenceError};
    use nbp_harness::FakeDom;
    use std::cell::RefCell;

    /// Scripted projection: keys map to "laid out?" flags.
    struct Scripted {
        next: Rc<RefCell<Result<BTreeMap<ActiveSetKey, bool>, PresenceError>>>,
        decay: Option<Duration>,
    }

    impl Projection for Scripted {
        type Request = bool;

        fn name(&self) -> &'static str {
            "scripted"
        }

        fn collect(&mut self) -> Result<BTreeMap<ActiveSetKey, bool>, PresenceError> {
            self.next.borrow().clone()
        }

        fn mount(&self, _key: &ActiveSetKey, _request: &bool) -> Mount {
            Mount::Body
        }

        fn render(
            &mut self,
            host: &dyn OverlayHost,
            _key: &ActiveSetKey,
            _request: &bool,
        ) -> Result<ElementId, HostError> {
            host.create(&ElementSpec::div("item"))
        }

        fn update(
            &mut self,
            host: &dyn OverlayHost,
            element: ElementId,
            key: &ActiveSetKey,
            laid_out: &bool,
        ) -> Result<RenderOutcome, HostError> {
            if !*laid_out {
                return Ok(RenderOutcome::LayoutUnavailable);
            }
            host.set_text(element, &key.to_string())?;
            Ok(RenderOutcome::Rendered)
        }

        fn decay_interval(&self) -> Option<Duration> {
            self.decay
        }

        fn modal_content(&self, key: &ActiveSetKey, _request: &bool) -> ModalContent {
            ModalContent::titled(key.to_string())
        }
    }

    fn key(n: u64) -> ActiveSetKey {
        ActiveSetKey::client(ClientId::new(n))
    }

    fn setup(
        decay: Option<Duration>,
        options: ReconcilerOptions,
    ) -> (
        Rc<FakeDom>,
        Rc<RefCell<Result<BTreeMap<ActiveSetKey, bool>, PresenceError>>>,
        Reconciler<Scripted, FakeDom>,
    ) {
        let dom = Rc::new(FakeDom::new());
        let next = Rc::new(RefCell::new(Ok(BTreeMap::new())));
        let projection = Scripted {
            next: Rc::clone(&next),
            decay,
        };
        let rec = Reconciler::new(Rc::clone(&dom), projection, options);
        (dom, next, rec)
    }

    fn set(
        next: &RefCell<Result<BTreeMap<ActiveSetKey, bool>, PresenceError>>,
        items: &[(u64, bool)],
    ) {
        *next.borrow_mut() = Ok(items.iter().map(|(n, ok)| (key(*n), *ok)).collect());
    }

    #[test]
    fn create_update_remove() {
        let (dom, next, mut rec) = setup(None, ReconcilerOptions::default());
        set(&next, &[(1, true), (2, true)]);
        let r = rec.pass(Duration::ZERO);
        assert_eq!((r.created, r.updated, r.removed), (2, 0, 0));
        let el = rec.element_for(&key(1)).unwrap();

        set(&next, &[(1, true), (3, true)]);
        let r = rec.pass(Duration::ZERO);
        assert_eq!((r.created, r.updated, r.removed), (1, 1, 1));
        assert_eq!(r.gone, vec![key(2)]);
        assert_eq!(rec.element_for(&key(1)), Some(el));
        assert_eq!(dom.attached_count(), 2);
        assert_eq!(rec.key_for(el), Some(&key(1)));
    }

    #[test]
    fn missing_layout_retains_existing_and_skips_new() {
        let (dom, next, mut rec) = setup(None, ReconcilerOptions::default());
        set(&next, &[(1, true)]);
        rec.pass(Duration::ZERO);
        set(&next, &[(1, false), (2, false)]);
        let r = rec.pass(Duration::ZERO);
        assert_eq!(r.deferred, 2);
        assert_eq!(r.created, 0);
        assert_eq!(dom.attached_count(), 1);
        assert_eq!(rec.stale_passes(&key(1)), Some(1));
    }

    #[test]
    fn stale_overlay_is_evicted_when_configured() {
        let options = ReconcilerOptions {
            stale_layout_passes: Some(2),
        };
        let (dom, next, mut rec) = setup(None, options);
        set(&next, &[(1, true)]);
        rec.pass(Duration::ZERO);
        set(&next, &[(1, false)]);
        assert_eq!(rec.pass(Duration::ZERO).evicted, 0);
        assert_eq!(rec.pass(Duration::ZERO).evicted, 1);
        assert_eq!(dom.attached_count(), 0);
        assert!(rec.is_empty());
    }

    #[test]
    fn collect_error_degrades_to_empty() {
        let (dom, next, mut rec) = setup(None, ReconcilerOptions::default());
        set(&next, &[(1, true)]);
        rec.pass(Duration::ZERO);
        *next.borrow_mut() = Err(PresenceError::malformed(None, "bad"));
        let r = rec.pass(Duration::ZERO);
        assert!(r.degraded);
        assert_eq!(r.removed, 1);
        assert_eq!(dom.attached_count(), 0);
    }

    #[test]
    fn decay_hides_and_removal_clears_timer() {
        let ms = Duration::from_millis;
        let (dom, next, mut rec) = setup(Some(ms(500)), ReconcilerOptions::default());
        set(&next, &[(1, true)]);
        rec.pass(ms(0));
        let el = rec.element_for(&key(1)).unwrap();
        assert_eq!(rec.tick(ms(500)), vec![key(1)]);
        assert!(!dom.is_visible(el));

        rec.pass(ms(600));
        assert!(dom.is_visible(el));
        assert_eq!(rec.next_deadline(), Some(ms(1100)));

        set(&next, &[]);
        rec.pass(ms(700));
        assert_eq!(rec.pending_timers(), 0);
        assert!(rec.tick(ms(5000)).is_empty());
    }

    #[test]
    fn clear_removes_everything() {
        let (dom, next, mut rec) =
            setup(Some(Duration::from_millis(500)), ReconcilerOptions::default());
        set(&next, &[(1, true), (2, true)]);
        rec.pass(Duration::ZERO);
        rec.clear();
        assert_eq!(dom.live_count(), 0);
        assert_eq!(dom.hover_watchers(), 0);
        assert_eq!(rec.pending_timers(), 0);
    }
}
