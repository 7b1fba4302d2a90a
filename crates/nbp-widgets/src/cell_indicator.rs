#![forbid(unsafe_code)]

//! Per-cell presence indicators.
//!
//! Every remote cursor that resolves into one of the notebook's current cells
//! gets a small avatar attached to that cell's element. A client with cursors
//! in two cells owns two indicators; two cursors in the same cell share one.
//! The cell set follows the host's cell-collection notifications; cursors in
//! cells that are not (or no longer) known are dropped.

use std::collections::BTreeMap;
use std::rc::Rc;

use ahash::AHashSet;
use nbp_core::snapshot::build_scoped;
use nbp_core::{
    ActiveSetKey, Awareness, AwarenessSnapshot, ContainerId, ContainerScope, ElementId,
    ElementSpec, HostError, Mount, NamePolicy, OverlayHost, PositionResolver, PresenceError,
    ScopedRequest,
};

use crate::avatar::paint_avatar;
use crate::modal::ModalContent;
use crate::projection::{Projection, RenderOutcome};

const INDICATOR: ElementSpec = ElementSpec::div("nbp-cell-avatar");

pub struct CellIndicatorProjection {
    awareness: Rc<dyn Awareness>,
    resolver: Rc<dyn PositionResolver>,
    scope: ContainerScope,
    policy: NamePolicy,
}

impl CellIndicatorProjection {
    pub fn new(
        awareness: Rc<dyn Awareness>,
        resolver: Rc<dyn PositionResolver>,
        policy: NamePolicy,
    ) -> Self {
        Self {
            awareness,
            resolver,
            scope: ContainerScope::AnyOf(AHashSet::new()),
            policy,
        }
    }

    /// Replace the set of cells currently present in the notebook.
    pub fn set_cells(&mut self, cells: impl IntoIterator<Item = ContainerId>) {
        self.scope = ContainerScope::AnyOf(cells.into_iter().collect());
    }

    pub fn cell_count(&self) -> usize {
        match &self.scope {
            ContainerScope::AnyOf(cells) => cells.len(),
            ContainerScope::Only(_) => 1,
        }
    }
}

impl Projection for CellIndicatorProjection {
    type Request = ScopedRequest;

    fn name(&self) -> &'static str {
        "cell-indicator"
    }

    fn collect(&mut self) -> Result<BTreeMap<ActiveSetKey, ScopedRequest>, PresenceError> {
        let snapshot = AwarenessSnapshot::capture(&*self.awareness);
        build_scoped(&snapshot, &self.scope, &*self.resolver, self.policy)
    }

    fn mount(&self, _key: &ActiveSetKey, request: &ScopedRequest) -> Mount {
        Mount::Cell(request.position.container.clone())
    }

    fn render(
        &mut self,
        host: &dyn OverlayHost,
        _key: &ActiveSetKey,
        _request: &ScopedRequest,
    ) -> Result<ElementId, HostError> {
        host.create(&INDICATOR)
    }

    fn update(
        &mut self,
        host: &dyn OverlayHost,
        element: ElementId,
        _key: &ActiveSetKey,
        request: &ScopedRequest,
    ) -> Result<RenderOutcome, HostError> {
        paint_avatar(host, element, &request.user)?;
        Ok(RenderOutcome::Rendered)
    }

    fn modal_content(&self, _key: &ActiveSetKey, request: &ScopedRequest) -> ModalContent {
        ModalContent::titled(request.user.title())
            .color(request.user.color.clone())
            .subtitle(format!("In cell {}", request.position.container))
    }
}
