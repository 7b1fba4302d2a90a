#![forbid(unsafe_code)]

//! Monospace [`EditorLayout`] stand-in.
//!
//! Offsets map to `origin + (offset * char_width, 0)`. Every lookup is
//! recorded so tests can check which offset was actually queried.

use std::cell::{Cell, RefCell};

use nbp_core::{ContainerId, EditorLayout, Point};

#[derive(Debug)]
pub struct FakeEditor {
    container: ContainerId,
    length: Cell<usize>,
    origin: Cell<Point>,
    char_width: f64,
    laid_out: Cell<bool>,
    queried: RefCell<Vec<usize>>,
}

impl FakeEditor {
    pub fn new(container: impl Into<ContainerId>, length: usize) -> Self {
        Self {
            container: container.into(),
            length: Cell::new(length),
            origin: Cell::new(Point::new(100.0, 200.0)),
            char_width: 8.0,
            laid_out: Cell::new(true),
            queried: RefCell::new(Vec::new()),
        }
    }

    pub fn set_length(&self, length: usize) {
        self.length.set(length);
    }

    /// Move the text origin (scrolling).
    pub fn set_origin(&self, origin: Point) {
        self.origin.set(origin);
    }

    /// Simulate the editor having no layout (scrolled away, not rendered).
    pub fn set_laid_out(&self, laid_out: bool) {
        self.laid_out.set(laid_out);
    }

    /// Offsets passed to `coords_at`, oldest first.
    pub fn queried_offsets(&self) -> Vec<usize> {
        self.queried.borrow().clone()
    }

    /// Expected coordinates for `offset`.
    pub fn point_for(&self, offset: usize) -> Point {
        let origin = self.origin.get();
        Point::new(origin.left + offset as f64 * self.char_width, origin.top)
    }
}

impl EditorLayout for FakeEditor {
    fn container(&self) -> &ContainerId {
        &self.container
    }

    fn document_length(&self) -> usize {
        self.length.get()
    }

    fn coords_at(&self, offset: usize) -> Option<Point> {
        self.queried.borrow_mut().push(offset);
        if !self.laid_out.get() || offset > self.length.get() {
            return None;
        }
        Some(self.point_for(offset))
    }
}
