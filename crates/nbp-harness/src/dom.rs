#![forbid(unsafe_code)]

//! In-memory [`OverlayHost`].
//!
//! `FakeDom` keeps a flat node table with parent links, so tests can ask how
//! many elements are attached, what a label's text and position are, and
//! whether any hover listeners survived a teardown.
//!
//! Geometry is synthetic: an element's rect is either set explicitly, or
//! derived from its `left`/`top` inline styles and the size registered for
//! its class.

use std::cell::RefCell;
use std::collections::BTreeMap;

use ahash::{AHashMap, AHashSet};
use nbp_core::{ContainerId, ElementId, ElementSpec, HostError, Mount, OverlayHost, Rect, Size};
use serde_json::{Value, json};

/// Size reported for classes without a registered size.
pub const DEFAULT_SIZE: Size = Size::new(120.0, 32.0);

/// One element in the fake DOM.
#[derive(Debug, Clone, PartialEq)]
pub struct FakeNode {
    pub id: ElementId,
    pub tag: &'static str,
    pub class: &'static str,
    pub text: String,
    pub styles: BTreeMap<String, String>,
    pub attributes: BTreeMap<String, String>,
    pub visible: bool,
    pub hover_watched: bool,
    pub parent: Option<ElementId>,
    pub mount: Option<Mount>,
    pub children: Vec<ElementId>,
}

impl FakeNode {
    pub fn style(&self, property: &str) -> Option<&str> {
        self.styles.get(property).map(String::as_str)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

#[derive(Debug)]
struct DomState {
    next_id: u64,
    nodes: AHashMap<ElementId, FakeNode>,
    cells: AHashSet<ContainerId>,
    toolbar: bool,
    viewport: Rect,
    sizes: AHashMap<&'static str, Size>,
    rects: AHashMap<ElementId, Rect>,
    created: u64,
    removed: u64,
    mutations: u64,
}

/// Recording DOM for tests.
#[derive(Debug)]
pub struct FakeDom {
    state: RefCell<DomState>,
}

impl Default for FakeDom {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDom {
    /// A 1280x800 viewport with a toolbar and no cells.
    pub fn new() -> Self {
        Self {
            state: RefCell::new(DomState {
                next_id: 1,
                nodes: AHashMap::new(),
                cells: AHashSet::new(),
                toolbar: true,
                viewport: Rect::new(0.0, 0.0, 1280.0, 800.0),
                sizes: AHashMap::new(),
                rects: AHashMap::new(),
                created: 0,
                removed: 0,
                mutations: 0,
            }),
        }
    }

    // --- configuration ---

    #[must_use]
    pub fn with_cells<I, S>(self, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ContainerId>,
    {
        for cell in cells {
            self.add_cell(cell);
        }
        self
    }

    pub fn add_cell(&self, cell: impl Into<ContainerId>) {
        self.state.borrow_mut().cells.insert(cell.into());
    }

    /// Drop a cell element from the document. Nodes mounted on it stay
    /// allocated but detached, the way they would in a browser.
    pub fn remove_cell(&self, cell: &ContainerId) {
        let mut state = self.state.borrow_mut();
        state.cells.remove(cell);
        for node in state.nodes.values_mut() {
            if matches!(&node.mount, Some(Mount::Cell(c)) if c == cell) {
                node.mount = None;
            }
        }
    }

    /// The editor re-rendered a cell: its old element leaves the document
    /// and a fresh, empty one takes its place.
    pub fn replace_cell(&self, cell: &ContainerId) {
        self.remove_cell(cell);
        self.add_cell(cell.clone());
    }

    pub fn set_toolbar_present(&self, present: bool) {
        self.state.borrow_mut().toolbar = present;
    }

    pub fn set_viewport(&self, viewport: Rect) {
        self.state.borrow_mut().viewport = viewport;
    }

    /// Size reported by `measure` for every element of `class`.
    pub fn set_class_size(&self, class: &'static str, size: Size) {
        self.state.borrow_mut().sizes.insert(class, size);
    }

    /// Pin an element's bounding rect.
    pub fn set_rect(&self, element: ElementId, rect: Rect) {
        self.state.borrow_mut().rects.insert(element, rect);
    }

    // --- queries ---

    pub fn node(&self, element: ElementId) -> Option<FakeNode> {
        self.state.borrow().nodes.get(&element).cloned()
    }

    pub fn exists(&self, element: ElementId) -> bool {
        self.state.borrow().nodes.contains_key(&element)
    }

    pub fn is_attached(&self, element: ElementId) -> bool {
        self.state.borrow().is_attached(element)
    }

    /// Elements that exist (attached or not).
    pub fn live_count(&self) -> usize {
        self.state.borrow().nodes.len()
    }

    /// Elements reachable from a mount point.
    pub fn attached_count(&self) -> usize {
        let state = self.state.borrow();
        state
            .nodes
            .keys()
            .filter(|id| state.is_attached(**id))
            .count()
    }

    /// Attached elements of `class`, in creation order.
    pub fn by_class(&self, class: &str) -> Vec<ElementId> {
        let state = self.state.borrow();
        let mut ids: Vec<ElementId> = state
            .nodes
            .values()
            .filter(|n| n.class == class && state.is_attached(n.id))
            .map(|n| n.id)
            .collect();
        ids.sort();
        ids
    }

    /// Top-level elements attached to `mount`, in creation order.
    pub fn mounted_at(&self, mount: &Mount) -> Vec<ElementId> {
        let state = self.state.borrow();
        let mut ids: Vec<ElementId> = state
            .nodes
            .values()
            .filter(|n| n.mount.as_ref() == Some(mount))
            .map(|n| n.id)
            .collect();
        ids.sort();
        ids
    }

    pub fn text(&self, element: ElementId) -> Option<String> {
        self.state
            .borrow()
            .nodes
            .get(&element)
            .map(|n| n.text.clone())
    }

    pub fn style(&self, element: ElementId, property: &str) -> Option<String> {
        self.state
            .borrow()
            .nodes
            .get(&element)
            .and_then(|n| n.style(property).map(str::to_string))
    }

    pub fn is_visible(&self, element: ElementId) -> bool {
        self.state
            .borrow()
            .nodes
            .get(&element)
            .is_some_and(|n| n.visible)
    }

    /// Live hover listeners.
    pub fn hover_watchers(&self) -> usize {
        self.state
            .borrow()
            .nodes
            .values()
            .filter(|n| n.hover_watched)
            .count()
    }

    pub fn created_total(&self) -> u64 {
        self.state.borrow().created
    }

    pub fn removed_total(&self) -> u64 {
        self.state.borrow().removed
    }

    /// Number of `set_*` calls applied.
    pub fn mutations(&self) -> u64 {
        self.state.borrow().mutations
    }

    /// Attached tree as JSON, for structural assertions.
    pub fn dump(&self) -> Value {
        let state = self.state.borrow();
        let mut roots: Vec<&FakeNode> =
            state.nodes.values().filter(|n| n.mount.is_some()).collect();
        roots.sort_by_key(|n| n.id);
        Value::Array(roots.into_iter().map(|n| state.dump_node(n)).collect())
    }
}

impl DomState {
    fn is_attached(&self, element: ElementId) -> bool {
        let mut cursor = self.nodes.get(&element);
        while let Some(node) = cursor {
            if node.mount.is_some() {
                return true;
            }
            cursor = node.parent.and_then(|p| self.nodes.get(&p));
        }
        false
    }

    fn node_mut(&mut self, element: ElementId) -> Result<&mut FakeNode, HostError> {
        self.nodes
            .get_mut(&element)
            .ok_or(HostError::UnknownElement(element.get()))
    }

    fn mutate(
        &mut self,
        element: ElementId,
        f: impl FnOnce(&mut FakeNode),
    ) -> Result<(), HostError> {
        let node = self.node_mut(element)?;
        f(node);
        self.mutations += 1;
        Ok(())
    }

    fn size_of(&self, node: &FakeNode) -> Size {
        self.sizes.get(node.class).copied().unwrap_or(DEFAULT_SIZE)
    }

    fn dump_node(&self, node: &FakeNode) -> Value {
        let children: Vec<Value> = node
            .children
            .iter()
            .filter_map(|c| self.nodes.get(c))
            .map(|c| self.dump_node(c))
            .collect();
        let mut value = json!({
            "class": node.class,
            "visible": node.visible,
        });
        if !node.text.is_empty() {
            value["text"] = json!(node.text);
        }
        if !children.is_empty() {
            value["children"] = Value::Array(children);
        }
        value
    }

    fn remove_subtree(&mut self, element: ElementId) {
        let Some(node) = self.nodes.remove(&element) else {
            return;
        };
        self.rects.remove(&element);
        self.removed += 1;
        for child in node.children {
            self.remove_subtree(child);
        }
    }
}

fn px(value: Option<&str>) -> Option<f64> {
    value?.strip_suffix("px")?.parse().ok()
}

impl OverlayHost for FakeDom {
    fn create(&self, spec: &ElementSpec) -> Result<ElementId, HostError> {
        let mut state = self.state.borrow_mut();
        let id = ElementId::new(state.next_id);
        state.next_id += 1;
        state.created += 1;
        state.nodes.insert(
            id,
            FakeNode {
                id,
                tag: spec.tag,
                class: spec.class,
                text: String::new(),
                styles: BTreeMap::new(),
                attributes: BTreeMap::new(),
                visible: true,
                hover_watched: false,
                parent: None,
                mount: None,
                children: Vec::new(),
            },
        );
        Ok(id)
    }

    fn attach(&self, element: ElementId, mount: &Mount) -> Result<(), HostError> {
        let mut state = self.state.borrow_mut();
        match mount {
            Mount::Body => {}
            Mount::Toolbar if !state.toolbar => {
                return Err(HostError::MountMissing("toolbar".into()));
            }
            Mount::Toolbar => {}
            Mount::Cell(cell) if !state.cells.contains(cell) => {
                return Err(HostError::missing_cell(cell));
            }
            Mount::Cell(_) => {}
        }
        let node = state.node_mut(element)?;
        node.mount = Some(mount.clone());
        Ok(())
    }

    fn append_child(&self, parent: ElementId, child: ElementId) -> Result<(), HostError> {
        let mut state = self.state.borrow_mut();
        if !state.nodes.contains_key(&parent) {
            return Err(HostError::UnknownElement(parent.get()));
        }
        state.node_mut(child)?.parent = Some(parent);
        state.node_mut(parent)?.children.push(child);
        Ok(())
    }

    fn set_text(&self, element: ElementId, text: &str) -> Result<(), HostError> {
        self.state
            .borrow_mut()
            .mutate(element, |n| n.text = text.to_string())
    }

    fn set_style(&self, element: ElementId, property: &str, value: &str) -> Result<(), HostError> {
        self.state.borrow_mut().mutate(element, |n| {
            n.styles.insert(property.to_string(), value.to_string());
        })
    }

    fn set_attribute(&self, element: ElementId, name: &str, value: &str) -> Result<(), HostError> {
        self.state.borrow_mut().mutate(element, |n| {
            n.attributes.insert(name.to_string(), value.to_string());
        })
    }

    fn set_visible(&self, element: ElementId, visible: bool) -> Result<(), HostError> {
        self.state
            .borrow_mut()
            .mutate(element, |n| n.visible = visible)
    }

    fn watch_hover(&self, element: ElementId) -> Result<(), HostError> {
        self.state.borrow_mut().node_mut(element)?.hover_watched = true;
        Ok(())
    }

    fn is_attached(&self, element: ElementId) -> bool {
        self.state.borrow().is_attached(element)
    }

    fn bounding_rect(&self, element: ElementId) -> Option<Rect> {
        let state = self.state.borrow();
        if !state.is_attached(element) {
            return None;
        }
        if let Some(rect) = state.rects.get(&element) {
            return Some(*rect);
        }
        let node = state.nodes.get(&element)?;
        let size = state.size_of(node);
        let left = px(node.style("left")).unwrap_or(0.0);
        let top = px(node.style("top")).unwrap_or(0.0);
        Some(Rect::new(left, top, size.width, size.height))
    }

    fn measure(&self, element: ElementId) -> Option<Size> {
        let state = self.state.borrow();
        let node = state.nodes.get(&element)?;
        Some(
            state
                .rects
                .get(&element)
                .map(Rect::size)
                .unwrap_or_else(|| state.size_of(node)),
        )
    }

    fn viewport(&self) -> Rect {
        self.state.borrow().viewport
    }

    fn remove(&self, element: ElementId) {
        let mut state = self.state.borrow_mut();
        let parent = state.nodes.get(&element).and_then(|n| n.parent);
        if let Some(parent) = parent
            && let Some(p) = state.nodes.get_mut(&parent)
        {
            p.children.retain(|c| *c != element);
        }
        state.remove_subtree(element);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn attach_to_unknown_cell_fails() {
        let dom = FakeDom::new();
        let el = dom.create(&ElementSpec::div("x")).unwrap();
        let err = dom.attach(el, &Mount::Cell("c9".into())).unwrap_err();
        assert_eq!(err, HostError::missing_cell(&ContainerId::new("c9")));
        assert!(!dom.is_attached(el));
    }

    #[test]
    fn remove_drops_subtree_and_listeners() {
        let dom = FakeDom::new();
        let root = dom.create(&ElementSpec::div("root")).unwrap();
        let child = dom.create(&ElementSpec::div("child")).unwrap();
        dom.append_child(root, child).unwrap();
        dom.attach(root, &Mount::Body).unwrap();
        dom.watch_hover(root).unwrap();
        assert_eq!(dom.attached_count(), 2);
        dom.remove(root);
        assert_eq!(dom.live_count(), 0);
        assert_eq!(dom.hover_watchers(), 0);
        assert_eq!(dom.removed_total(), 2);
        dom.remove(root);
    }

    #[test]
    fn replaced_cell_detaches_its_nodes() {
        let dom = FakeDom::new().with_cells(["c1", "c2"]);
        let on_c1 = dom.create(&ElementSpec::div("x")).unwrap();
        let on_c2 = dom.create(&ElementSpec::div("x")).unwrap();
        dom.attach(on_c1, &Mount::Cell("c1".into())).unwrap();
        dom.attach(on_c2, &Mount::Cell("c2".into())).unwrap();
        dom.replace_cell(&ContainerId::new("c1"));
        assert!(dom.exists(on_c1));
        assert!(!dom.is_attached(on_c1));
        assert_eq!(dom.bounding_rect(on_c1), None);
        assert!(dom.is_attached(on_c2));
        dom.attach(on_c1, &Mount::Cell("c1".into())).unwrap();
        assert!(dom.is_attached(on_c1));
    }

    #[test]
    fn rect_follows_inline_position() {
        let dom = FakeDom::new();
        dom.set_class_size("label", Size::new(40.0, 16.0));
        let el = dom.create(&ElementSpec::div("label")).unwrap();
        assert_eq!(dom.bounding_rect(el), None);
        dom.attach(el, &Mount::Body).unwrap();
        dom.set_style(el, "left", "100px").unwrap();
        dom.set_style(el, "top", "20px").unwrap();
        assert_eq!(
            dom.bounding_rect(el),
            Some(Rect::new(100.0, 20.0, 40.0, 16.0))
        );
    }

    #[test]
    fn dump_lists_attached_tree() {
        let dom = FakeDom::new();
        let root = dom.create(&ElementSpec::div("stack")).unwrap();
        let chip = dom.create(&ElementSpec::div("chip")).unwrap();
        dom.set_text(chip, "+2").unwrap();
        dom.append_child(root, chip).unwrap();
        dom.attach(root, &Mount::Toolbar).unwrap();
        assert_eq!(
            dom.dump(),
            json!([{ "class": "stack", "visible": true,
                     "children": [{ "class": "chip", "visible": true, "text": "+2" }] }])
        );
    }
}
