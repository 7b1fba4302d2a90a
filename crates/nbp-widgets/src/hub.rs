#![forbid(unsafe_code)]

//! Composition root for every presence surface on a page.
//!
//! [`PresenceHub`] owns the single [`ModalController`] and hands it to each
//! widget it registers, so one modal is shared page-wide without any global
//! state. Widgets are grouped by document panel; disposing a panel disposes
//! everything registered for it.

use core::time::Duration;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use nbp_core::{Awareness, ContainerId, EditorLayout, ElementId, OverlayHost, PositionResolver};
use nbp_runtime::{DirtyReasons, PresenceConfig};

use crate::cell_indicator::CellIndicatorProjection;
use crate::cursor_label::CursorLabelProjection;
use crate::modal::{ModalController, ModalKey, ModalTarget, WidgetId};
use crate::placement::Anchored;
use crate::projection::PassReport;
use crate::reconciler::ReconcilerOptions;
use crate::roster::RosterProjection;
use crate::widget::{PresenceSurface, PresenceWidget};

/// A host document panel (one open notebook).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PanelId(pub u32);

impl std::fmt::Display for PanelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "panel-{}", self.0)
    }
}

struct Panel<H: OverlayHost> {
    roster: Option<PresenceWidget<RosterProjection, H>>,
    cells: Option<PresenceWidget<CellIndicatorProjection, H>>,
    labels: BTreeMap<ContainerId, PresenceWidget<CursorLabelProjection, H>>,
}

impl<H: OverlayHost> Default for Panel<H> {
    fn default() -> Self {
        Self {
            roster: None,
            cells: None,
            labels: BTreeMap::new(),
        }
    }
}

impl<H: OverlayHost> Panel<H> {
    fn surfaces(&self) -> impl Iterator<Item = &dyn PresenceSurface> {
        self.roster
            .iter()
            .map(|w| w as &dyn PresenceSurface)
            .chain(self.cells.iter().map(|w| w as &dyn PresenceSurface))
            .chain(self.labels.values().map(|w| w as &dyn PresenceSurface))
    }

    fn surfaces_mut(&mut self) -> impl Iterator<Item = &mut dyn PresenceSurface> {
        self.roster
            .iter_mut()
            .map(|w| w as &mut dyn PresenceSurface)
            .chain(self.cells.iter_mut().map(|w| w as &mut dyn PresenceSurface))
            .chain(self.labels.values_mut().map(|w| w as &mut dyn PresenceSurface))
    }
}

/// Page-level owner of presence widgets and the shared modal.
pub struct PresenceHub<H: OverlayHost> {
    host: Rc<H>,
    config: PresenceConfig,
    modal: Rc<RefCell<ModalController<H>>>,
    panels: BTreeMap<PanelId, Panel<H>>,
    next_widget: u32,
}

impl<H: OverlayHost + 'static> std::fmt::Debug for PresenceHub<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceHub")
            .field("panels", &self.panels.len())
            .field("widgets", &self.widget_count())
            .finish()
    }
}

impl<H: OverlayHost + 'static> PresenceHub<H> {
    pub fn new(host: Rc<H>, config: PresenceConfig) -> Self {
        let modal = ModalController::new(
            Rc::clone(&host),
            config.modal_hide_delay(),
            Anchored::new(config.modal.gap_px, config.modal.viewport_margin_px),
        );
        Self {
            host,
            config,
            modal: Rc::new(RefCell::new(modal)),
            panels: BTreeMap::new(),
            next_widget: 1,
        }
    }

    fn allocate(&mut self) -> WidgetId {
        let id = WidgetId(self.next_widget);
        self.next_widget = self.next_widget.wrapping_add(1);
        id
    }

    fn options(&self) -> ReconcilerOptions {
        ReconcilerOptions {
            stale_layout_passes: self.config.stale_layout_passes,
        }
    }

    fn widget<P: crate::projection::Projection>(
        &mut self,
        awareness: Rc<dyn Awareness>,
        projection: P,
    ) -> PresenceWidget<P, H> {
        let id = self.allocate();
        PresenceWidget::new(
            id,
            awareness,
            Rc::clone(&self.host),
            projection,
            Rc::clone(&self.modal),
            self.options(),
        )
    }

    /// Register (or replace) the toolbar roster of `panel`.
    pub fn register_roster(&mut self, panel: PanelId, awareness: Rc<dyn Awareness>) -> WidgetId {
        let projection = RosterProjection::new(
            Rc::clone(&awareness),
            self.config.roster.names,
            self.config.roster.max_avatars,
        );
        let widget = self.widget(awareness, projection);
        let id = widget.id();
        self.panels.entry(panel).or_default().roster = Some(widget);
        tracing::debug!(%panel, widget = %id, "roster registered");
        id
    }

    /// Register (or replace) the cell indicators of `panel`.
    pub fn register_cells(
        &mut self,
        panel: PanelId,
        awareness: Rc<dyn Awareness>,
        resolver: Rc<dyn PositionResolver>,
        cells: impl IntoIterator<Item = ContainerId>,
    ) -> WidgetId {
        let mut projection =
            CellIndicatorProjection::new(Rc::clone(&awareness), resolver, self.config.cells.names);
        projection.set_cells(cells);
        let widget = self.widget(awareness, projection);
        let id = widget.id();
        self.panels.entry(panel).or_default().cells = Some(widget);
        tracing::debug!(%panel, widget = %id, "cell indicators registered");
        id
    }

    /// Register (or replace) the cursor labels of one editor in `panel`.
    pub fn register_label(
        &mut self,
        panel: PanelId,
        awareness: Rc<dyn Awareness>,
        resolver: Rc<dyn PositionResolver>,
        editor: Rc<dyn EditorLayout>,
    ) -> WidgetId {
        let container = editor.container().clone();
        let projection = CursorLabelProjection::new(
            Rc::clone(&awareness),
            resolver,
            editor,
            self.config.labels.names,
            self.config.decay_interval(),
        );
        let widget = self.widget(awareness, projection);
        let id = widget.id();
        self.panels
            .entry(panel)
            .or_default()
            .labels
            .insert(container, widget);
        tracing::debug!(%panel, widget = %id, "cursor labels registered");
        id
    }

    /// Dispose the cursor labels of one editor (the editor was destroyed).
    pub fn unregister_label(&mut self, panel: PanelId, container: &ContainerId) -> bool {
        self.panels
            .get_mut(&panel)
            .and_then(|p| p.labels.remove(container))
            .is_some()
    }

    /// The notebook's cell collection changed.
    pub fn set_cells(
        &mut self,
        panel: PanelId,
        cells: impl IntoIterator<Item = ContainerId>,
    ) -> bool {
        let Some(widget) = self.panels.get_mut(&panel).and_then(|p| p.cells.as_mut()) else {
            return false;
        };
        widget.projection_mut().set_cells(cells);
        widget.notify(DirtyReasons::CELLS)
    }

    /// An editor's document, selection, or viewport changed.
    pub fn notify_editor(
        &mut self,
        panel: PanelId,
        container: &ContainerId,
        reasons: DirtyReasons,
    ) -> bool {
        self.panels
            .get_mut(&panel)
            .and_then(|p| p.labels.get_mut(container))
            .is_some_and(|w| w.notify(reasons))
    }

    /// Mark every widget of `panel` dirty.
    pub fn notify_panel(&mut self, panel: PanelId, reasons: DirtyReasons) -> bool {
        let Some(p) = self.panels.get_mut(&panel) else {
            return false;
        };
        p.surfaces_mut()
            .fold(false, |scheduled, w| w.notify(reasons) | scheduled)
    }

    /// Whether any widget waits for an animation frame.
    pub fn is_frame_pending(&self) -> bool {
        self.panels
            .values()
            .any(|p| p.surfaces().any(|w| w.is_frame_pending()))
    }

    /// Run every pending reconciliation pass.
    pub fn animation_frame(&mut self, now: Duration) -> Vec<(WidgetId, PassReport)> {
        let mut reports = Vec::new();
        for panel in self.panels.values_mut() {
            for widget in panel.surfaces_mut() {
                if let Some(report) = widget.animation_frame(now) {
                    reports.push((widget.id(), report));
                }
            }
        }
        reports
    }

    /// Advance decay and modal timers. Returns `true` if anything changed.
    pub fn tick(&mut self, now: Duration) -> bool {
        let mut changed = self.modal.borrow_mut().tick(now);
        for panel in self.panels.values_mut() {
            for widget in panel.surfaces_mut() {
                changed |= !widget.tick(now).is_empty();
            }
        }
        changed
    }

    /// Route a pointer enter/leave. Returns `true` if a presence element
    /// handled it.
    ///
    /// Hovering the modal keeps the overlay it describes pinned.
    pub fn hover(&mut self, element: ElementId, entered: bool, now: Duration) -> bool {
        let on_modal = self.modal.borrow_mut().hover(element, entered, now);
        if on_modal {
            let target = self.modal.borrow().target().cloned();
            if let Some(ModalTarget {
                widget,
                key: ModalKey::Overlay(key),
            }) = target
                && let Some(owner) = self
                    .panels
                    .values_mut()
                    .flat_map(|p| p.surfaces_mut())
                    .find(|w| w.id() == widget)
            {
                owner.hold(&key, entered, now);
            }
            return true;
        }
        self.panels
            .values_mut()
            .any(|p| p.surfaces_mut().any(|w| w.hover(element, entered, now)))
    }

    /// Earliest timer deadline across the modal and all widgets.
    pub fn next_deadline(&self) -> Option<Duration> {
        let modal = self.modal.borrow().next_deadline();
        self.panels
            .values()
            .flat_map(|p| p.surfaces())
            .filter_map(|w| w.next_deadline())
            .chain(modal)
            .min()
    }

    /// Dispose every widget of `panel`.
    pub fn dispose_panel(&mut self, panel: PanelId) -> bool {
        let Some(mut p) = self.panels.remove(&panel) else {
            return false;
        };
        for widget in p.surfaces_mut() {
            widget.dispose();
        }
        tracing::debug!(%panel, "panel disposed");
        true
    }

    /// Dispose everything, including the modal.
    pub fn dispose_all(&mut self) {
        let panels: Vec<PanelId> = self.panels.keys().copied().collect();
        for panel in panels {
            self.dispose_panel(panel);
        }
        if let Ok(mut modal) = self.modal.try_borrow_mut() {
            modal.close();
        }
    }

    pub fn modal(&self) -> &Rc<RefCell<ModalController<H>>> {
        &self.modal
    }

    pub fn config(&self) -> &PresenceConfig {
        &self.config
    }

    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    pub fn widget_count(&self) -> usize {
        self.panels.values().map(|p| p.surfaces().count()).sum()
    }

    pub fn roster(&self, panel: PanelId) -> Option<&PresenceWidget<RosterProjection, H>> {
        self.panels.get(&panel)?.roster.as_ref()
    }

    pub fn cells(&self, panel: PanelId) -> Option<&PresenceWidget<CellIndicatorProjection, H>> {
        self.panels.get(&panel)?.cells.as_ref()
    }

    pub fn label(
        &self,
        panel: PanelId,
        container: &ContainerId,
    ) -> Option<&PresenceWidget<CursorLabelProjection, H>> {
        self.panels.get(&panel)?.labels.get(container)
    }
}

impl<H: OverlayHost> Drop for PresenceHub<H> {
    fn drop(&mut self) {
        // Widgets dispose themselves on drop; the modal is ours to close.
        self.panels.clear();
        if let Ok(mut modal) = self.modal.try_borrow_mut() {
            modal.close();
        }
    }
}
