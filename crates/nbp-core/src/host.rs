#![forbid(unsafe_code)]

//! DOM abstraction driven by the presence surfaces.
//!
//! [`OverlayHost`] is the only way presence code touches the page. Methods
//! take `&self` because hosts are cheap handles over shared state (a
//! `web_sys::Document`, or the in-memory DOM used in tests).
//!
//! Elements are referenced by opaque [`ElementId`] handles. Removing an
//! element removes its whole subtree and releases any hover listeners the
//! host registered for it.

use crate::awareness::ContainerId;
use crate::error::HostError;
use crate::geometry::{Rect, Size};

/// Opaque handle to a host element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(u64);

impl ElementId {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Where a top-level overlay element is attached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mount {
    /// Document body; used for viewport-fixed labels and modals.
    Body,
    /// The document panel's toolbar slot.
    Toolbar,
    /// The element of one notebook cell.
    Cell(ContainerId),
}

/// Element to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpec {
    pub tag: &'static str,
    pub class: &'static str,
}

impl ElementSpec {
    pub const fn new(tag: &'static str, class: &'static str) -> Self {
        Self { tag, class }
    }

    pub const fn div(class: &'static str) -> Self {
        Self::new("div", class)
    }
}

/// Page-side operations used by the reconcilers and the modal controller.
pub trait OverlayHost {
    /// Create a detached element.
    fn create(&self, spec: &ElementSpec) -> Result<ElementId, HostError>;

    /// Attach a top-level element to a mount point.
    fn attach(&self, element: ElementId, mount: &Mount) -> Result<(), HostError>;

    /// Append `child` under `parent`.
    fn append_child(&self, parent: ElementId, child: ElementId) -> Result<(), HostError>;

    fn set_text(&self, element: ElementId, text: &str) -> Result<(), HostError>;

    fn set_style(&self, element: ElementId, property: &str, value: &str)
    -> Result<(), HostError>;

    fn set_attribute(&self, element: ElementId, name: &str, value: &str)
    -> Result<(), HostError>;

    /// Toggle visibility without detaching the element.
    fn set_visible(&self, element: ElementId, visible: bool) -> Result<(), HostError>;

    /// Start reporting pointer enter/leave for `element`.
    fn watch_hover(&self, element: ElementId) -> Result<(), HostError>;

    /// Whether the element is still part of the page. Overlays mounted on a
    /// cell element that the editor re-rendered report `false`.
    fn is_attached(&self, element: ElementId) -> bool;

    /// Current viewport rectangle of an attached element.
    fn bounding_rect(&self, element: ElementId) -> Option<Rect>;

    /// Rendered size of an element (after content was set).
    fn measure(&self, element: ElementId) -> Option<Size> {
        self.bounding_rect(element).map(|r| r.size())
    }

    /// The visible viewport.
    fn viewport(&self) -> Rect;

    /// Detach and release an element and its subtree. Unknown ids are ignored.
    fn remove(&self, element: ElementId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn div_spec() {
        let spec = ElementSpec::div("nbp-avatar");
        assert_eq!(spec.tag, "div");
        assert_eq!(spec.class, "nbp-avatar");
    }

    #[test]
    fn element_ids_order_by_raw() {
        assert!(ElementId::new(1) < ElementId::new(2));
        assert_eq!(ElementId::new(9).get(), 9);
    }
}
