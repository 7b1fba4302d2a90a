#![forbid(unsafe_code)]

//! Floating name labels that follow remote cursors in one editor.
//!
//! Labels live on the document body and are positioned in viewport
//! coordinates taken from the editor's layout. Their screen position moves
//! whenever the local view changes, so besides awareness changes the widget
//! also reacts to document, selection, and viewport updates.
//!
//! Each successful render restarts the label's fade-out countdown. A label
//! whose cursor position is not laid out (scrolled away) keeps its last
//! position until layout comes back.

use core::time::Duration;
use std::collections::BTreeMap;
use std::rc::Rc;

use nbp_core::snapshot::build_scoped;
use nbp_core::{
    ActiveSetKey, Awareness, AwarenessSnapshot, ContainerScope, EditorLayout, ElementId,
    ElementSpec, HostError, Mount, NamePolicy, OverlayHost, PositionResolver, PresenceError,
    ScopedRequest,
};

use crate::modal::ModalContent;
use crate::projection::{Projection, RenderOutcome};

const LABEL: ElementSpec = ElementSpec::div("nbp-cursor-label");

pub struct CursorLabelProjection {
    awareness: Rc<dyn Awareness>,
    resolver: Rc<dyn PositionResolver>,
    editor: Rc<dyn EditorLayout>,
    scope: ContainerScope,
    policy: NamePolicy,
    interval: Duration,
}

impl CursorLabelProjection {
    pub fn new(
        awareness: Rc<dyn Awareness>,
        resolver: Rc<dyn PositionResolver>,
        editor: Rc<dyn EditorLayout>,
        policy: NamePolicy,
        interval: Duration,
    ) -> Self {
        let scope = ContainerScope::Only(editor.container().clone());
        Self {
            awareness,
            resolver,
            editor,
            scope,
            policy,
            interval,
        }
    }

    pub fn editor(&self) -> &Rc<dyn EditorLayout> {
        &self.editor
    }

    /// Offset used for layout: concurrent edits can leave a resolved offset
    /// past the end of the document for a moment.
    fn clamped_offset(&self, request: &ScopedRequest) -> usize {
        request.position.offset.min(self.editor.document_length())
    }
}

impl Projection for CursorLabelProjection {
    type Request = ScopedRequest;

    fn name(&self) -> &'static str {
        "cursor-label"
    }

    fn collect(&mut self) -> Result<BTreeMap<ActiveSetKey, ScopedRequest>, PresenceError> {
        let snapshot = AwarenessSnapshot::capture(&*self.awareness);
        build_scoped(&snapshot, &self.scope, &*self.resolver, self.policy)
    }

    fn mount(&self, _key: &ActiveSetKey, _request: &ScopedRequest) -> Mount {
        Mount::Body
    }

    fn render(
        &mut self,
        host: &dyn OverlayHost,
        _key: &ActiveSetKey,
        _request: &ScopedRequest,
    ) -> Result<ElementId, HostError> {
        host.create(&LABEL)
    }

    fn update(
        &mut self,
        host: &dyn OverlayHost,
        element: ElementId,
        _key: &ActiveSetKey,
        request: &ScopedRequest,
    ) -> Result<RenderOutcome, HostError> {
        let offset = self.clamped_offset(request);
        let Some(at) = self.editor.coords_at(offset) else {
            return Ok(RenderOutcome::LayoutUnavailable);
        };
        host.set_text(element, &request.user.name)?;
        host.set_style(element, "background-color", &request.user.color)?;
        host.set_style(element, "left", &format!("{}px", at.left))?;
        host.set_style(element, "top", &format!("{}px", at.top))?;
        Ok(RenderOutcome::Rendered)
    }

    fn decay_interval(&self) -> Option<Duration> {
        Some(self.interval)
    }

    fn modal_content(&self, _key: &ActiveSetKey, request: &ScopedRequest) -> ModalContent {
        ModalContent::titled(request.user.title())
            .color(request.user.color.clone())
            .subtitle(format!(
                "Editing {} at offset {}",
                request.position.container,
                self.clamped_offset(request)
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::{Reconciler, ReconcilerOptions};
    use nbp_core::{ClientId, Point};
    use nbp_harness::{FakeDom, FakeEditor, StaticResolver, anonymous_at, named_at};
    use nbp_runtime::MemoryAwareness;

    struct Fixture {
        dom: Rc<FakeDom>,
        awareness: Rc<MemoryAwareness>,
        resolver: Rc<StaticResolver>,
        editor: Rc<FakeEditor>,
        rec: Reconciler<CursorLabelProjection, FakeDom>,
    }

    fn fixture(policy: NamePolicy) -> Fixture {
        let dom = Rc::new(FakeDom::new());
        let awareness = Rc::new(MemoryAwareness::new(ClientId::new(1)));
        let resolver = Rc::new(StaticResolver::new());
        let editor = Rc::new(FakeEditor::new("cell-a", 100));
        let projection = CursorLabelProjection::new(
            awareness.clone(),
            resolver.clone(),
            editor.clone(),
            policy,
            Duration::from_millis(500),
        );
        let rec = Reconciler::new(Rc::clone(&dom), projection, ReconcilerOptions::default());
        Fixture {
            dom,
            awareness,
            resolver,
            editor,
            rec,
        }
    }

    #[test]
    fn label_positioned_at_cursor() {
        let mut f = fixture(NamePolicy::Skip);
        f.resolver.set("p", "cell-a", 10);
        f.awareness.set_state(ClientId::new(7), named_at("Ada", &["p"]));
        f.rec.pass(Duration::ZERO);
        let label = f.dom.by_class("nbp-cursor-label")[0];
        let expected = f.editor.point_for(10);
        assert_eq!(f.dom.style(label, "left"), Some(format!("{}px", expected.left)));
        assert_eq!(f.dom.style(label, "top"), Some(format!("{}px", expected.top)));
        assert_eq!(f.dom.text(label).as_deref(), Some("Ada"));
    }

    #[test]
    fn cursors_in_other_editors_are_ignored() {
        let mut f = fixture(NamePolicy::Skip);
        f.resolver.set("p", "cell-b", 10);
        f.awareness.set_state(ClientId::new(7), named_at("Ada", &["p"]));
        f.rec.pass(Duration::ZERO);
        assert_eq!(f.dom.live_count(), 0);
    }

    #[test]
    fn unnamed_cursor_is_skipped_by_default() {
        let mut f = fixture(NamePolicy::Skip);
        f.resolver.set("p", "cell-a", 10);
        f.awareness.set_state(ClientId::new(7), anonymous_at(&["p"]));
        f.rec.pass(Duration::ZERO);
        assert_eq!(f.dom.live_count(), 0);
    }

    #[test]
    fn unnamed_cursor_with_fallback_policy() {
        let mut f = fixture(NamePolicy::Fallback);
        f.resolver.set("p", "cell-a", 10);
        f.awareness.set_state(ClientId::new(7), anonymous_at(&["p"]));
        f.rec.pass(Duration::ZERO);
        let label = f.dom.by_class("nbp-cursor-label")[0];
        assert_eq!(f.dom.text(label).as_deref(), Some("User 7"));
    }

    #[test]
    fn label_follows_scroll_in_place() {
        let mut f = fixture(NamePolicy::Skip);
        f.resolver.set("p", "cell-a", 2);
        f.awareness.set_state(ClientId::new(7), named_at("Ada", &["p"]));
        f.rec.pass(Duration::ZERO);
        let label = f.dom.by_class("nbp-cursor-label")[0];
        f.editor.set_origin(Point::new(0.0, 50.0));
        f.rec.pass(Duration::from_millis(16));
        assert_eq!(f.dom.by_class("nbp-cursor-label"), vec![label]);
        assert_eq!(f.dom.style(label, "top").as_deref(), Some("50px"));
    }
}
