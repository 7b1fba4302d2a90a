#![forbid(unsafe_code)]

//! [`OverlayHost`] backed by the real DOM through `web-sys`.
//!
//! Element handles are plain integers; the host keeps the `HtmlElement`
//! behind each one together with its hover listeners. Listeners are
//! `Closure`s owned by the host and unregistered on [`OverlayHost::remove`],
//! so removing an overlay never leaks a callback. Hover events are forwarded
//! to a JS callback `(elementId, entered)`; the page routes them back into
//! the runner.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use nbp_core::{ContainerId, ElementId, ElementSpec, HostError, Mount, OverlayHost, Rect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement};

struct HoverListeners {
    enter: Closure<dyn FnMut()>,
    leave: Closure<dyn FnMut()>,
}

struct Tracked {
    element: HtmlElement,
    children: Vec<u64>,
    hover: Option<HoverListeners>,
}

pub struct DomHost {
    document: Document,
    on_hover: js_sys::Function,
    toolbar: RefCell<Option<Element>>,
    cells: RefCell<BTreeMap<ContainerId, Element>>,
    elements: RefCell<BTreeMap<u64, Tracked>>,
    next_id: Cell<u64>,
}

fn rejected(_: JsValue) -> HostError {
    HostError::Unsupported("DOM call rejected")
}

impl DomHost {
    pub fn new(document: Document, on_hover: js_sys::Function) -> Self {
        Self {
            document,
            on_hover,
            toolbar: RefCell::new(None),
            cells: RefCell::new(BTreeMap::new()),
            elements: RefCell::new(BTreeMap::new()),
            next_id: Cell::new(1),
        }
    }

    pub fn set_toolbar(&self, toolbar: Option<Element>) {
        *self.toolbar.borrow_mut() = toolbar;
    }

    /// Register the element for `cell`. Overlays still sitting in a
    /// previous element for the same cell move over to the new one.
    pub fn set_cell_element(&self, cell: ContainerId, element: Element) {
        let previous = self.cells.borrow_mut().insert(cell, element.clone());
        let Some(previous) = previous.filter(|old| *old != element) else {
            return;
        };
        for tracked in self.elements.borrow().values() {
            let node = &tracked.element;
            if node.parent_element().as_ref() == Some(&previous) {
                let _ = element.append_child(node);
            }
        }
    }

    pub fn remove_cell_element(&self, cell: &ContainerId) {
        self.cells.borrow_mut().remove(cell);
    }

    pub fn live_count(&self) -> usize {
        self.elements.borrow().len()
    }

    fn element(&self, element: ElementId) -> Result<HtmlElement, HostError> {
        self.elements
            .borrow()
            .get(&element.get())
            .map(|t| t.element.clone())
            .ok_or(HostError::UnknownElement(element.get()))
    }

    fn mount_point(&self, mount: &Mount) -> Result<Element, HostError> {
        match mount {
            Mount::Body => self
                .document
                .body()
                .map(Into::into)
                .ok_or_else(|| HostError::MountMissing("document body".to_string())),
            Mount::Toolbar => self
                .toolbar
                .borrow()
                .clone()
                .ok_or_else(|| HostError::MountMissing("toolbar".to_string())),
            Mount::Cell(cell) => self
                .cells
                .borrow()
                .get(cell)
                .cloned()
                .ok_or_else(|| HostError::missing_cell(cell)),
        }
    }

    fn hover_closure(&self, id: u64, entered: bool) -> Closure<dyn FnMut()> {
        let callback = self.on_hover.clone();
        Closure::<dyn FnMut()>::new(move || {
            let _ = callback.call2(
                &JsValue::NULL,
                &JsValue::from_f64(id as f64),
                &JsValue::from_bool(entered),
            );
        })
    }

    fn release(&self, id: u64) {
        let Some(tracked) = self.elements.borrow_mut().remove(&id) else {
            return;
        };
        if let Some(hover) = tracked.hover {
            let target = &tracked.element;
            let _ = target.remove_event_listener_with_callback(
                "mouseenter",
                hover.enter.as_ref().unchecked_ref(),
            );
            let _ = target.remove_event_listener_with_callback(
                "mouseleave",
                hover.leave.as_ref().unchecked_ref(),
            );
        }
        for child in tracked.children {
            self.release(child);
        }
        tracked.element.remove();
    }
}

impl OverlayHost for DomHost {
    fn create(&self, spec: &ElementSpec) -> Result<ElementId, HostError> {
        let element: HtmlElement = self
            .document
            .create_element(spec.tag)
            .map_err(rejected)?
            .dyn_into()
            .map_err(|_| HostError::Unsupported("not an HTML element"))?;
        element.set_class_name(spec.class);
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1));
        self.elements.borrow_mut().insert(
            id,
            Tracked {
                element,
                children: Vec::new(),
                hover: None,
            },
        );
        Ok(ElementId::new(id))
    }

    fn attach(&self, element: ElementId, mount: &Mount) -> Result<(), HostError> {
        let node = self.element(element)?;
        let parent = self.mount_point(mount)?;
        parent.append_child(&node).map_err(rejected)?;
        Ok(())
    }

    fn append_child(&self, parent: ElementId, child: ElementId) -> Result<(), HostError> {
        let parent_node = self.element(parent)?;
        let child_node = self.element(child)?;
        parent_node.append_child(&child_node).map_err(rejected)?;
        if let Some(tracked) = self.elements.borrow_mut().get_mut(&parent.get()) {
            tracked.children.push(child.get());
        }
        Ok(())
    }

    fn set_text(&self, element: ElementId, text: &str) -> Result<(), HostError> {
        self.element(element)?.set_text_content(Some(text));
        Ok(())
    }

    fn set_style(
        &self,
        element: ElementId,
        property: &str,
        value: &str,
    ) -> Result<(), HostError> {
        self.element(element)?
            .style()
            .set_property(property, value)
            .map_err(rejected)
    }

    fn set_attribute(
        &self,
        element: ElementId,
        name: &str,
        value: &str,
    ) -> Result<(), HostError> {
        self.element(element)?
            .set_attribute(name, value)
            .map_err(rejected)
    }

    fn set_visible(&self, element: ElementId, visible: bool) -> Result<(), HostError> {
        let style = self.element(element)?.style();
        let (opacity, visibility) = if visible { ("1", "visible") } else { ("0", "hidden") };
        style.set_property("opacity", opacity).map_err(rejected)?;
        style.set_property("visibility", visibility).map_err(rejected)
    }

    fn watch_hover(&self, element: ElementId) -> Result<(), HostError> {
        let node = self.element(element)?;
        let id = element.get();
        let enter = self.hover_closure(id, true);
        let leave = self.hover_closure(id, false);
        node.add_event_listener_with_callback("mouseenter", enter.as_ref().unchecked_ref())
            .map_err(rejected)?;
        node.add_event_listener_with_callback("mouseleave", leave.as_ref().unchecked_ref())
            .map_err(rejected)?;
        if let Some(tracked) = self.elements.borrow_mut().get_mut(&id) {
            tracked.hover = Some(HoverListeners { enter, leave });
        }
        Ok(())
    }

    fn is_attached(&self, element: ElementId) -> bool {
        self.element(element).is_ok_and(|node| node.is_connected())
    }

    fn bounding_rect(&self, element: ElementId) -> Option<Rect> {
        let node = self.element(element).ok()?;
        if !node.is_connected() {
            return None;
        }
        let r = node.get_bounding_client_rect();
        Some(Rect::new(r.left(), r.top(), r.width(), r.height()))
    }

    fn viewport(&self) -> Rect {
        let Some(window) = web_sys::window() else {
            return Rect::default();
        };
        let width = window
            .inner_width()
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let height = window
            .inner_height()
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        Rect::new(0.0, 0.0, width, height)
    }

    fn remove(&self, element: ElementId) {
        self.release(element.get());
    }
}

impl Drop for DomHost {
    fn drop(&mut self) {
        let ids: Vec<u64> = self.elements.borrow().keys().copied().collect();
        for id in ids {
            self.release(id);
        }
    }
}
