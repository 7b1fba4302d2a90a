#![forbid(unsafe_code)]

//! The page-wide hover modal.
//!
//! One [`ModalController`] is shared by every presence widget of a page
//! (through `Rc<RefCell<..>>`, held by the composition root). It shows at most
//! one modal at a time:
//!
//! - `show` cancels any pending hide and replaces the current modal. Showing
//!   the open target again keeps its element and refreshes it in place.
//! - `schedule_hide` arms a short debounce so the pointer can travel from the
//!   trigger onto the modal without it closing.
//! - Hovering the modal itself cancels the pending hide; leaving it re-arms it.
//!
//! Calls are applied strictly in the order they arrive; the last caller wins.

use core::time::Duration;
use std::rc::Rc;

use nbp_core::{ActiveSetKey, ElementId, ElementSpec, HostError, Mount, OverlayHost, Rect};

use crate::placement::{Anchored, Placement};

const MODAL: ElementSpec = ElementSpec::div("nbp-modal");
const MODAL_TITLE: ElementSpec = ElementSpec::div("nbp-modal-title");
const MODAL_SUBTITLE: ElementSpec = ElementSpec::div("nbp-modal-subtitle");
const MODAL_LINE: ElementSpec = ElementSpec::div("nbp-modal-line");

/// Identity of a registered presence widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WidgetId(pub u32);

impl std::fmt::Display for WidgetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// What a modal describes inside its widget.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModalKey {
    /// One rendered overlay.
    Overlay(ActiveSetKey),
    /// A surface-owned element that is not an overlay (e.g. the overflow chip).
    Chrome(&'static str),
}

/// Owner of the visible modal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModalTarget {
    pub widget: WidgetId,
    pub key: ModalKey,
}

impl ModalTarget {
    pub fn new(widget: WidgetId, key: ModalKey) -> Self {
        Self { widget, key }
    }
}

/// Text shown in a modal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModalContent {
    pub title: String,
    pub subtitle: Option<String>,
    /// Accent color (the user's color).
    pub color: Option<String>,
    pub lines: Vec<String>,
}

impl ModalContent {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    #[must_use]
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    #[must_use]
    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }
}

#[derive(Debug, Clone)]
struct OpenModal {
    target: ModalTarget,
    anchor: ElementId,
    element: ElementId,
    /// Title, subtitle, and line nodes under `element`.
    parts: Vec<ElementId>,
    content: ModalContent,
    placement: Placement,
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModalStats {
    pub shown: u64,
    pub replaced: u64,
    pub hidden: u64,
}

/// Single-instance hover modal.
#[derive(Debug)]
pub struct ModalController<H: OverlayHost> {
    host: Rc<H>,
    hide_delay: Duration,
    placement: Anchored,
    open: Option<OpenModal>,
    hide_deadline: Option<Duration>,
    stats: ModalStats,
}

impl<H: OverlayHost> ModalController<H> {
    pub fn new(host: Rc<H>, hide_delay: Duration, placement: Anchored) -> Self {
        Self {
            host,
            hide_delay,
            placement,
            open: None,
            hide_deadline: None,
            stats: ModalStats::default(),
        }
    }

    /// Show `content` for `target`, anchored to `anchor`.
    ///
    /// Re-showing the already open target keeps its element: the content is
    /// rebuilt if it changed and the modal is placed against the anchor's
    /// current rect. Returns `Ok(false)` when the anchor has no layout;
    /// nothing is shown (an open modal for the same target is closed).
    pub fn show(
        &mut self,
        target: ModalTarget,
        anchor: ElementId,
        content: &ModalContent,
    ) -> Result<bool, HostError> {
        self.cancel_hide();
        let reshow = self
            .open
            .as_ref()
            .is_some_and(|open| open.target == target && open.anchor == anchor);
        if reshow {
            return self.refresh(content);
        }
        if self.open.is_some() {
            self.stats.replaced += 1;
            self.close();
        }
        let Some(anchor_rect) = self.host.bounding_rect(anchor) else {
            tracing::trace!(widget = %target.widget, "modal anchor has no layout");
            return Ok(false);
        };

        let (element, parts) = self.build(content)?;
        if let Err(err) = self.host.attach(element, &Mount::Body) {
            self.host.remove(element);
            return Err(err);
        }
        let placed = self
            .position(element, anchor_rect)
            .and_then(|placement| self.host.watch_hover(element).map(|()| placement));
        let placement = match placed {
            Ok(placement) => placement,
            Err(err) => {
                self.host.remove(element);
                return Err(err);
            }
        };

        tracing::debug!(widget = %target.widget, ?placement, "modal shown");
        self.stats.shown += 1;
        self.open = Some(OpenModal {
            target,
            anchor,
            element,
            parts,
            content: content.clone(),
            placement,
        });
        Ok(true)
    }

    fn refresh(&mut self, content: &ModalContent) -> Result<bool, HostError> {
        let Some(open) = self.open.as_ref() else {
            return Ok(false);
        };
        let (element, anchor) = (open.element, open.anchor);
        let stale = (open.content != *content).then(|| open.parts.clone());
        let Some(anchor_rect) = self.host.bounding_rect(anchor) else {
            self.close();
            return Ok(false);
        };
        if let Some(stale) = stale {
            for part in stale {
                self.host.remove(part);
            }
            let color = content.color.as_deref().unwrap_or("");
            let rebuilt = self
                .host
                .set_style(element, "border-color", color)
                .and_then(|()| fill_parts(&*self.host, element, content));
            let parts = match rebuilt {
                Ok(parts) => parts,
                Err(err) => {
                    self.close();
                    return Err(err);
                }
            };
            if let Some(open) = self.open.as_mut() {
                open.parts = parts;
                open.content = content.clone();
            }
        }
        let placement = self.position(element, anchor_rect)?;
        if let Some(open) = self.open.as_mut() {
            open.placement = placement;
        }
        Ok(true)
    }

    /// Measure `element` and move it next to `anchor_rect`.
    fn position(&self, element: ElementId, anchor_rect: Rect) -> Result<Placement, HostError> {
        let size = self.host.measure(element).unwrap_or_default();
        let (at, placement) = self
            .placement
            .place(anchor_rect, size, self.host.viewport());
        self.host
            .set_style(element, "left", &format!("{}px", at.left))?;
        self.host
            .set_style(element, "top", &format!("{}px", at.top))?;
        Ok(placement)
    }

    fn build(&self, content: &ModalContent) -> Result<(ElementId, Vec<ElementId>), HostError> {
        let host = &*self.host;
        let root = host.create(&MODAL)?;
        let filled = content
            .color
            .as_deref()
            .map_or(Ok(()), |color| host.set_style(root, "border-color", color))
            .and_then(|()| fill_parts(host, root, content));
        match filled {
            Ok(parts) => Ok((root, parts)),
            Err(err) => {
                host.remove(root);
                Err(err)
            }
        }
    }

    /// Arm the debounced hide. Replaces any pending deadline.
    pub fn schedule_hide(&mut self, now: Duration) {
        if self.open.is_some() {
            self.hide_deadline = Some(now.saturating_add(self.hide_delay));
        }
    }

    pub fn cancel_hide(&mut self) {
        self.hide_deadline = None;
    }

    /// Close the modal if its hide deadline passed. Returns `true` if closed.
    pub fn tick(&mut self, now: Duration) -> bool {
        match self.hide_deadline {
            Some(deadline) if deadline <= now => {
                self.close();
                true
            }
            _ => false,
        }
    }

    /// Pointer enter/leave on the modal element itself.
    ///
    /// Returns `false` for elements that are not the open modal.
    pub fn hover(&mut self, element: ElementId, entered: bool, now: Duration) -> bool {
        if self.element() != Some(element) {
            return false;
        }
        if entered {
            self.cancel_hide();
        } else {
            self.schedule_hide(now);
        }
        true
    }

    /// Close immediately.
    pub fn close(&mut self) {
        self.hide_deadline = None;
        if let Some(open) = self.open.take() {
            self.host.remove(open.element);
            self.stats.hidden += 1;
            tracing::trace!(widget = %open.target.widget, "modal closed");
        }
    }

    /// Close the modal if `widget` owns it.
    pub fn dismiss_widget(&mut self, widget: WidgetId) -> bool {
        if self.open.as_ref().is_some_and(|o| o.target.widget == widget) {
            self.close();
            return true;
        }
        false
    }

    /// Close the modal if it belongs to `target`.
    pub fn dismiss_target(&mut self, target: &ModalTarget) -> bool {
        if self.open.as_ref().is_some_and(|o| &o.target == target) {
            self.close();
            return true;
        }
        false
    }

    /// Close the modal if `widget` owns it and its anchor left the page.
    pub fn dismiss_detached(&mut self, widget: WidgetId) -> bool {
        let detached = self.open.as_ref().is_some_and(|o| {
            o.target.widget == widget && self.host.bounding_rect(o.anchor).is_none()
        });
        if detached {
            self.close();
        }
        detached
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn target(&self) -> Option<&ModalTarget> {
        self.open.as_ref().map(|o| &o.target)
    }

    pub fn element(&self) -> Option<ElementId> {
        self.open.as_ref().map(|o| o.element)
    }

    pub fn placement(&self) -> Option<Placement> {
        self.open.as_ref().map(|o| o.placement)
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.hide_deadline
    }

    pub fn stats(&self) -> ModalStats {
        self.stats
    }
}

fn fill_parts(
    host: &dyn OverlayHost,
    root: ElementId,
    content: &ModalContent,
) -> Result<Vec<ElementId>, HostError> {
    let texts = std::iter::once((&MODAL_TITLE, content.title.as_str()))
        .chain(content.subtitle.as_deref().map(|s| (&MODAL_SUBTITLE, s)))
        .chain(content.lines.iter().map(|l| (&MODAL_LINE, l.as_str())));
    let mut parts = Vec::with_capacity(2 + content.lines.len());
    for (spec, text) in texts {
        let el = host.create(spec)?;
        parts.push(el);
        let appended = host
            .append_child(root, el)
            .and_then(|()| host.set_text(el, text));
        if let Err(err) = appended {
            for part in parts {
                host.remove(part);
            }
            return Err(err);
        }
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbp_core::{ClientId, Rect, Size};
    use nbp_harness::FakeDom;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn setup() -> (Rc<FakeDom>, ModalController<FakeDom>, ElementId) {
        let dom = Rc::new(FakeDom::new());
        dom.set_class_size("nbp-modal", Size::new(100.0, 40.0));
        let anchor = dom.create(&ElementSpec::div("anchor")).unwrap();
        dom.attach(anchor, &Mount::Toolbar).unwrap();
        dom.set_rect(anchor, Rect::new(400.0, 300.0, 20.0, 20.0));
        let modal = ModalController::new(Rc::clone(&dom), ms(200), Anchored::default());
        (dom, modal, anchor)
    }

    fn target(n: u64) -> ModalTarget {
        ModalTarget::new(WidgetId(1), ModalKey::Overlay(ActiveSetKey::client(ClientId::new(n))))
    }

    #[test]
    fn show_positions_above_anchor() {
        let (dom, mut modal, anchor) = setup();
        let content = ModalContent::titled("Ada").subtitle("cell c1").line("x");
        assert!(modal.show(target(1), anchor, &content).unwrap());
        let el = modal.element().unwrap();
        assert_eq!(dom.style(el, "left").as_deref(), Some("360px"));
        assert_eq!(dom.style(el, "top").as_deref(), Some("254px"));
        assert_eq!(modal.placement(), Some(Placement::Above));
        assert_eq!(dom.by_class("nbp-modal-line").len(), 1);
    }

    #[test]
    fn only_one_modal_at_a_time() {
        let (dom, mut modal, anchor) = setup();
        modal.show(target(1), anchor, &ModalContent::titled("a")).unwrap();
        modal.show(target(2), anchor, &ModalContent::titled("b")).unwrap();
        assert_eq!(dom.by_class("nbp-modal").len(), 1);
        assert_eq!(modal.target(), Some(&target(2)));
        assert_eq!(modal.stats().replaced, 1);
    }

    #[test]
    fn hide_is_debounced_and_cancellable() {
        let (dom, mut modal, anchor) = setup();
        modal.show(target(1), anchor, &ModalContent::titled("a")).unwrap();
        modal.schedule_hide(ms(1000));
        assert!(!modal.tick(ms(1100)));
        let el = modal.element().unwrap();
        assert!(modal.hover(el, true, ms(1150)));
        assert!(!modal.tick(ms(1300)));
        assert!(modal.hover(el, false, ms(1300)));
        assert_eq!(modal.next_deadline(), Some(ms(1500)));
        assert!(modal.tick(ms(1500)));
        assert_eq!(dom.live_count(), 1);
        assert_eq!(dom.hover_watchers(), 0);
    }

    #[test]
    fn reshow_same_target_keeps_element() {
        let (dom, mut modal, anchor) = setup();
        modal.show(target(1), anchor, &ModalContent::titled("a")).unwrap();
        let el = modal.element();
        modal.schedule_hide(ms(0));
        modal.show(target(1), anchor, &ModalContent::titled("a")).unwrap();
        assert_eq!(modal.element(), el);
        assert_eq!(modal.next_deadline(), None);
        assert_eq!(dom.created_total(), 3);
    }

    #[test]
    fn reshow_refreshes_content_and_follows_anchor() {
        let (dom, mut modal, anchor) = setup();
        let old = ModalContent::titled("old").subtitle("cell c1");
        modal.show(target(1), anchor, &old).unwrap();
        let el = modal.element().unwrap();
        assert_eq!(dom.style(el, "top").as_deref(), Some("254px"));

        dom.set_rect(anchor, Rect::new(400.0, 500.0, 20.0, 20.0));
        let new = ModalContent::titled("new").color("#ff0000").line("a").line("b");
        assert!(modal.show(target(1), anchor, &new).unwrap());

        assert_eq!(modal.element(), Some(el));
        assert_eq!(dom.style(el, "top").as_deref(), Some("454px"));
        assert_eq!(dom.style(el, "border-color").as_deref(), Some("#ff0000"));
        let titles = dom.by_class("nbp-modal-title");
        assert_eq!(titles.len(), 1);
        assert_eq!(dom.text(titles[0]).as_deref(), Some("new"));
        assert!(dom.by_class("nbp-modal-subtitle").is_empty());
        assert_eq!(dom.by_class("nbp-modal-line").len(), 2);
        assert_eq!(modal.stats().shown, 1);
    }

    #[test]
    fn reshow_closes_when_anchor_lost_layout() {
        let (dom, mut modal, anchor) = setup();
        modal.show(target(1), anchor, &ModalContent::titled("a")).unwrap();
        dom.remove(anchor);
        assert!(!modal.show(target(1), anchor, &ModalContent::titled("a")).unwrap());
        assert!(!modal.is_open());
        assert!(dom.by_class("nbp-modal").is_empty());
    }

    #[test]
    fn unlaid_anchor_shows_nothing() {
        let (dom, mut modal, _) = setup();
        let detached = dom.create(&ElementSpec::div("anchor")).unwrap();
        assert!(!modal.show(target(1), detached, &ModalContent::titled("a")).unwrap());
        assert!(!modal.is_open());
    }

    #[test]
    fn dismiss_widget_only_closes_own_modal() {
        let (_, mut modal, anchor) = setup();
        modal.show(target(1), anchor, &ModalContent::titled("a")).unwrap();
        assert!(!modal.dismiss_widget(WidgetId(9)));
        assert!(modal.dismiss_widget(WidgetId(1)));
        assert!(!modal.is_open());
    }
}
