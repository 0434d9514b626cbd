//! Top-level editing state machine and command surface.

use crate::drawing::DrawingSession;
use crate::events::{DeleteDecision, EditorHost, NullHost};
use crate::feature::{Feature, FeatureCollection, GeometryKind};
use crate::input::PointerEvent;
use crate::selection::SelectionRegistry;
use crate::snap::{self, SnapCandidate};
use crate::store::FeatureStore;
use crate::surface::{EditSurface, EditorStyles, OverlayId};
use crate::vertex_edit::{VertexEditSession, VertexMode, VertexRef};
use kurbo::Point;
use thiserror::Error;

/// Errors for commands with unmet preconditions.
///
/// Wrong-state calls (confirming with no open session, toggling sub-modes
/// with no session) are deliberately NOT errors; they are warn-level no-ops,
/// favoring robustness of an interactive control over strict protocol
/// enforcement.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    /// No rendering surface has been bound.
    #[error("no rendering surface is bound")]
    SurfaceNotBound,
    /// No feature store has been bound.
    #[error("no feature store is bound")]
    StoreNotBound,
}

/// Engine configuration, supplied by the embedding application.
#[derive(Debug, Clone)]
pub struct EditorOptions {
    /// Snap newly drawn points to existing vertices.
    pub snap_enabled: bool,
    /// Snap radius in screen pixels.
    pub snap_distance_px: f64,
    /// Let a double-click finish a drawing once the minimum point count is
    /// met.
    pub allow_double_click_finish: bool,
    /// Hit radius for vertex handles in screen pixels.
    pub handle_hit_radius_px: f64,
    /// Overlay styling.
    pub styles: EditorStyles,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            snap_enabled: true,
            snap_distance_px: snap::DEFAULT_SNAP_DISTANCE_PX,
            allow_double_click_finish: true,
            handle_hit_radius_px: 10.0,
            styles: EditorStyles::default(),
        }
    }
}

/// Current mode of the editing engine, derived from open sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    /// Editing is not active; pointer events are ignored.
    Idle,
    /// Editing is active with no session open.
    Editing,
    /// A drawing session is accepting points.
    Drawing(GeometryKind),
    /// A vertex-edit session is open in the given sub-mode.
    VertexEditing(VertexMode),
}

/// Overlays belonging to one vertex-edit entry.
struct EntryOverlays {
    outline: OverlayId,
    handles: Vec<OverlayId>,
}

/// Top-level state machine wiring mode transitions and orchestrating
/// commit/rollback across sessions, store, surface, and host.
///
/// Single-threaded and event-driven: every transition happens synchronously
/// on the thread that owns the rendering surface. The one suspension point
/// is the host round-trip inside [`delete_selected_features`]; while that
/// future is live the coordinator is exclusively borrowed, so no other
/// command can interleave.
///
/// [`delete_selected_features`]: EditingCoordinator::delete_selected_features
pub struct EditingCoordinator {
    options: EditorOptions,
    surface: Option<Box<dyn EditSurface>>,
    store: Option<Box<dyn FeatureStore>>,
    host: Box<dyn EditorHost>,
    selection: SelectionRegistry,
    editing_enabled: bool,
    drawing: Option<DrawingSession>,
    drawing_overlay: Option<OverlayId>,
    vertex_edit: Option<VertexEditSession>,
    edit_overlays: Vec<EntryOverlays>,
    /// Outlines left on the surface by `disable_editing_features`, swept on
    /// the next session or on `stop_editing`.
    stale_outlines: Vec<OverlayId>,
}

impl Default for EditingCoordinator {
    fn default() -> Self {
        Self::new(EditorOptions::default())
    }
}

impl EditingCoordinator {
    /// Create a coordinator with no collaborators bound. A surface must be
    /// bound before `start_editing`; a store before anything can commit.
    pub fn new(options: EditorOptions) -> Self {
        Self {
            options,
            surface: None,
            store: None,
            host: Box::new(NullHost),
            selection: SelectionRegistry::new(),
            editing_enabled: false,
            drawing: None,
            drawing_overlay: None,
            vertex_edit: None,
            edit_overlays: Vec::new(),
            stale_outlines: Vec::new(),
        }
    }

    /// Bind the rendering surface.
    pub fn bind_surface(&mut self, surface: Box<dyn EditSurface>) {
        self.surface = Some(surface);
    }

    /// Bind the feature store.
    pub fn bind_store(&mut self, store: Box<dyn FeatureStore>) {
        self.store = Some(store);
    }

    /// Install the host notification sink (defaults to [`NullHost`]).
    pub fn set_host(&mut self, host: Box<dyn EditorHost>) {
        self.host = host;
    }

    /// The engine configuration.
    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    /// The selection registry, for the embedding application's selection
    /// handling to read.
    pub fn selection(&self) -> &SelectionRegistry {
        &self.selection
    }

    /// Mutable access to the selection registry; selection changes come
    /// from outside the engine.
    pub fn selection_mut(&mut self) -> &mut SelectionRegistry {
        &mut self.selection
    }

    /// Read access to the bound store, if any.
    pub fn store(&self) -> Option<&dyn FeatureStore> {
        self.store.as_deref()
    }

    /// The current mode, derived from the enabled flag and open sessions.
    pub fn mode(&self) -> EditorMode {
        if !self.editing_enabled {
            EditorMode::Idle
        } else if let Some(session) = self.drawing.as_ref() {
            EditorMode::Drawing(session.kind())
        } else if let Some(session) = self.vertex_edit.as_ref() {
            EditorMode::VertexEditing(session.mode())
        } else {
            EditorMode::Editing
        }
    }

    /// Enter editing. Suppresses the surface's native double-click zoom so
    /// double-click can be reserved for finishing drawings.
    pub fn start_editing(&mut self) -> Result<(), EditError> {
        let surface = self.surface.as_mut().ok_or(EditError::SurfaceNotBound)?;
        if self.editing_enabled {
            log::warn!("start_editing: editing is already active");
            return Ok(());
        }
        surface.set_double_click_zoom(false);
        self.editing_enabled = true;
        log::debug!("editing started");
        Ok(())
    }

    /// Leave editing from any state. Open sessions are discarded without
    /// committing and the native double-click zoom is restored.
    pub fn stop_editing(&mut self) {
        self.drop_drawing();
        self.vertex_edit = None;
        self.drop_vertex_overlays();
        self.sweep_stale_outlines();
        if self.editing_enabled {
            self.editing_enabled = false;
            if let Some(surface) = self.surface.as_mut() {
                surface.set_double_click_zoom(true);
            }
            log::debug!("editing stopped");
        }
    }

    /// Open a polygon drawing session.
    pub fn add_polygon(&mut self) {
        self.start_drawing(GeometryKind::Polygon);
    }

    /// Open a line drawing session.
    pub fn add_line(&mut self) {
        self.start_drawing(GeometryKind::Line);
    }

    fn start_drawing(&mut self, kind: GeometryKind) {
        if !self.editing_enabled {
            log::warn!("start_drawing: editing is not active");
            return;
        }
        // Exactly one session may be open: entering Drawing cancels an
        // active vertex-edit batch first.
        if self.vertex_edit.is_some() {
            self.cancel_editing();
        }
        if self.drawing.is_some() {
            log::debug!("discarding uncommitted drawing session");
            self.drop_drawing();
        }
        self.drawing = Some(DrawingSession::new(
            kind,
            self.options.snap_enabled,
            self.options.snap_distance_px,
            self.options.allow_double_click_finish,
        ));
        log::debug!("drawing session opened: {kind:?}");
    }

    /// Validate and commit the open drawing session as a new feature.
    ///
    /// Below the minimum point count this is a warning-level no-op and the
    /// session stays open for further input.
    pub fn confirm_drawing(&mut self) -> Result<(), EditError> {
        let Some(session) = self.drawing.as_ref() else {
            log::warn!("confirm_drawing: no drawing session is open");
            return Ok(());
        };
        let Some(geometry) = session.finish() else {
            log::warn!(
                "confirm_drawing: {} of {} points placed; session stays open",
                session.points().len(),
                session.min_points()
            );
            return Ok(());
        };
        if self.store.is_none() {
            return Err(EditError::StoreNotBound);
        }
        let feature = Feature::new(geometry);
        if let Some(store) = self.store.as_mut() {
            store.add(feature.clone());
        }
        self.drop_drawing();
        self.host.feature_created(&feature);
        Ok(())
    }

    /// Discard the open drawing session and its preview.
    pub fn cancel_drawing(&mut self) {
        if self.drawing.is_none() {
            log::warn!("cancel_drawing: no drawing session is open");
            return;
        }
        self.drop_drawing();
        self.host.drawing_cancelled();
    }

    /// Open a vertex-edit session over the current selection.
    ///
    /// An empty selection is a warning-level no-op. The initial sub-mode is
    /// Move: vertices are draggable as soon as editing handles appear.
    pub fn edit_selected_features(&mut self) -> Result<(), EditError> {
        if !self.editing_enabled {
            log::warn!("edit_selected_features: editing is not active");
            return Ok(());
        }
        if self.selection.is_empty() {
            log::warn!("edit_selected_features: selection is empty");
            return Ok(());
        }
        if self.store.is_none() {
            return Err(EditError::StoreNotBound);
        }
        // Exactly one session may be open: drop a pending drawing first.
        if self.drawing.is_some() {
            self.cancel_drawing();
        }
        if self.vertex_edit.is_some() {
            self.cancel_editing();
        }
        self.sweep_stale_outlines();

        let session = {
            let Some(store) = self.store.as_deref() else {
                return Err(EditError::StoreNotBound);
            };
            let features: Vec<&Feature> = self
                .selection
                .ids()
                .iter()
                .filter_map(|&id| store.get(id))
                .collect();
            if features.is_empty() {
                log::warn!("edit_selected_features: no selected feature is in the store");
                return Ok(());
            }
            VertexEditSession::open(&features)
        };
        self.vertex_edit = Some(session);
        self.spawn_edit_overlays();
        Ok(())
    }

    /// Arm or disarm AddVertex mode.
    pub fn set_add_vertex_mode(&mut self, enabled: bool) {
        self.set_vertex_mode(VertexMode::Add, enabled);
    }

    /// Arm or disarm RemoveVertex mode.
    pub fn set_remove_vertex_mode(&mut self, enabled: bool) {
        self.set_vertex_mode(VertexMode::Remove, enabled);
    }

    /// Arm MoveVertex mode, the neutral default. Enabling it disarms Add
    /// and Remove.
    pub fn set_move_vertex_mode(&mut self, enabled: bool) {
        self.set_vertex_mode(VertexMode::Move, enabled);
    }

    fn set_vertex_mode(&mut self, mode: VertexMode, enabled: bool) {
        let Some(session) = self.vertex_edit.as_mut() else {
            log::warn!("vertex mode change ignored: no vertex-edit session is open");
            return;
        };
        if enabled {
            // Mutually exclusive: arming one mode disarms the others
            session.set_mode(mode);
        } else if session.mode() == mode {
            session.set_mode(VertexMode::Move);
        }
    }

    /// Write every entry's live vertices into its feature and close the
    /// session. Raises one `feature_modified` per entry.
    pub fn confirm_editing(&mut self) -> Result<(), EditError> {
        if self.vertex_edit.is_none() {
            log::warn!("confirm_editing: no vertex-edit session is open");
            return Ok(());
        }
        if self.store.is_none() {
            return Err(EditError::StoreNotBound);
        }
        let Some(session) = self.vertex_edit.take() else {
            return Ok(());
        };
        let mut modified = Vec::new();
        if let Some(store) = self.store.as_mut() {
            for (id, geometry) in session.committed_geometries() {
                if store.update_geometry(id, geometry) {
                    if let Some(feature) = store.get(id) {
                        modified.push(feature.clone());
                    }
                } else {
                    log::warn!("confirm_editing: feature {id} is no longer in the store");
                }
            }
        }
        self.drop_vertex_overlays();
        for feature in &modified {
            self.host.feature_modified(feature);
        }
        Ok(())
    }

    /// Discard the vertex-edit session. The store was never mutated, so
    /// dropping the session and its overlays restores the pre-edit picture
    /// exactly.
    pub fn cancel_editing(&mut self) {
        if self.vertex_edit.is_none() {
            log::warn!("cancel_editing: no vertex-edit session is open");
            return;
        }
        self.vertex_edit = None;
        self.drop_vertex_overlays();
    }

    /// Stop showing edit handles without committing or rolling back.
    ///
    /// Deliberately distinct from both [`confirm_editing`] and
    /// [`cancel_editing`]: the live outline overlays stay on the surface,
    /// the store is untouched, and no notification is raised. The leftover
    /// outlines are swept when the next session opens or editing stops.
    ///
    /// [`confirm_editing`]: EditingCoordinator::confirm_editing
    /// [`cancel_editing`]: EditingCoordinator::cancel_editing
    pub fn disable_editing_features(&mut self) {
        if self.vertex_edit.is_none() {
            log::warn!("disable_editing_features: no vertex-edit session is open");
            return;
        }
        self.vertex_edit = None;
        let overlays = std::mem::take(&mut self.edit_overlays);
        for entry in overlays {
            self.stale_outlines.push(entry.outline);
            if let Some(surface) = self.surface.as_mut() {
                for handle in entry.handles {
                    surface.remove_overlay(handle);
                }
            }
        }
    }

    /// Cancelable, host-confirmed removal of the selected features.
    ///
    /// Raises `feature_deleting` and awaits the host's verdict before
    /// touching the store; a veto or a failed round-trip aborts with no
    /// state change. The round-trip has no timeout; an unresponsive host
    /// leaves the delete pending indefinitely. While the returned future is
    /// live the coordinator is exclusively borrowed, so a second delete
    /// cannot start before the first resolves.
    pub async fn delete_selected_features(&mut self) -> Result<(), EditError> {
        if self.selection.is_empty() {
            log::warn!("delete_selected_features: selection is empty");
            return Ok(());
        }
        if self.store.is_none() {
            return Err(EditError::StoreNotBound);
        }
        let doomed: Vec<Feature> = {
            let Some(store) = self.store.as_deref() else {
                return Err(EditError::StoreNotBound);
            };
            self.selection
                .ids()
                .iter()
                .filter_map(|&id| store.get(id))
                .cloned()
                .collect()
        };
        if doomed.is_empty() {
            log::warn!("delete_selected_features: no selected feature is in the store");
            return Ok(());
        }

        match self.host.feature_deleting(&doomed).await {
            Ok(DeleteDecision::Proceed) => {}
            Ok(DeleteDecision::Cancel) => {
                log::debug!("delete vetoed by host");
                return Ok(());
            }
            Err(err) => {
                // A failed round-trip is an implicit cancel
                log::warn!("delete confirmation failed, aborting: {err}");
                return Ok(());
            }
        }

        // Drop edit handles before the features disappear; the leftover
        // outlines go with them.
        if self.vertex_edit.is_some() {
            self.disable_editing_features();
        }
        self.sweep_stale_outlines();

        for feature in &doomed {
            if let Some(store) = self.store.as_mut() {
                store.remove(feature.id);
            }
            self.host.feature_deleted(feature);
        }
        self.selection.clear();
        self.host.selection_cleared();
        Ok(())
    }

    /// Snapshot of every feature currently in the store.
    pub fn current_features(&self) -> Result<FeatureCollection, EditError> {
        let store = self.store.as_deref().ok_or(EditError::StoreNotBound)?;
        Ok(FeatureCollection {
            features: store.features().into_iter().cloned().collect(),
        })
    }

    /// Dispatch a pointer event to the active session. Ignored while Idle.
    pub fn handle_pointer(&mut self, event: PointerEvent) {
        if !self.editing_enabled {
            return;
        }
        match event {
            PointerEvent::Click { screen, geo } => self.on_click(screen, geo),
            PointerEvent::DoubleClick { .. } => self.on_double_click(),
            PointerEvent::Down { screen, geo } => self.on_down(screen, geo),
            PointerEvent::Move { screen, geo } => self.on_move(screen, geo),
            PointerEvent::Up { .. } => self.on_up(),
        }
    }

    fn on_click(&mut self, screen: Point, geo: Point) {
        if self.drawing.is_some() {
            self.push_drawing_point(screen, geo);
            return;
        }
        let hit_radius = self.options.handle_hit_radius_px;
        let (Some(session), Some(surface)) =
            (self.vertex_edit.as_mut(), self.surface.as_deref())
        else {
            return;
        };
        match session.mode() {
            VertexMode::Add => {
                if let Some(at) = session.add_vertex(screen, geo, surface, hit_radius) {
                    self.rebuild_entry_overlays(at.entry);
                }
            }
            VertexMode::Remove => {
                if let Some(at) = session.remove_vertex(screen, surface, hit_radius) {
                    self.rebuild_entry_overlays(at.entry);
                }
            }
            VertexMode::Move => {}
        }
    }

    /// A double-click finishes the drawing only when the session allows it
    /// and the minimum point count is already satisfied. Otherwise nothing
    /// happens; the native zoom gesture stays suppressed either way.
    fn on_double_click(&mut self) {
        let Some(session) = self.drawing.as_ref() else {
            return;
        };
        if session.allow_double_click_finish() && session.can_finish() {
            if let Err(err) = self.confirm_drawing() {
                log::warn!("double-click finish failed: {err}");
            }
        }
    }

    fn on_down(&mut self, screen: Point, _geo: Point) {
        let hit_radius = self.options.handle_hit_radius_px;
        let (Some(session), Some(surface)) =
            (self.vertex_edit.as_mut(), self.surface.as_deref())
        else {
            return;
        };
        if session.mode() != VertexMode::Move {
            return;
        }
        session.begin_drag(screen, surface, hit_radius);
    }

    fn on_move(&mut self, _screen: Point, geo: Point) {
        let Some(session) = self.vertex_edit.as_mut() else {
            return;
        };
        let Some(at) = session.drag_to(geo) else {
            return;
        };
        self.refresh_dragged_vertex(at);
    }

    fn on_up(&mut self) {
        if let Some(session) = self.vertex_edit.as_mut() {
            session.end_drag();
        }
    }

    /// Every existing vertex a drawn point may snap to: all vertices of all
    /// store features plus the points already placed in this session (so a
    /// ring can close onto its own first vertex).
    fn snap_candidates(&self) -> Vec<SnapCandidate> {
        let Some(surface) = self.surface.as_deref() else {
            return Vec::new();
        };
        let mut candidates = Vec::new();
        if let Some(store) = self.store.as_deref() {
            for feature in store.features() {
                for &geo in feature.geometry.open_vertices() {
                    candidates.push(SnapCandidate {
                        geo,
                        screen: surface.project(geo),
                    });
                }
            }
        }
        if let Some(session) = self.drawing.as_ref() {
            for &geo in session.points() {
                candidates.push(SnapCandidate {
                    geo,
                    screen: surface.project(geo),
                });
            }
        }
        candidates
    }

    fn push_drawing_point(&mut self, screen: Point, geo: Point) {
        let candidates = self.snap_candidates();
        let style = self.options.styles.drawing;
        let (Some(session), Some(surface)) = (self.drawing.as_mut(), self.surface.as_mut())
        else {
            return;
        };
        session.push_point(screen, geo, &candidates);
        match self.drawing_overlay {
            Some(id) => surface.update_overlay(id, session.points()),
            None => {
                self.drawing_overlay = Some(surface.add_overlay(session.points(), &style));
            }
        }
    }

    /// Create outline + handle overlays for every entry of a fresh session.
    fn spawn_edit_overlays(&mut self) {
        let outline_style = self.options.styles.edit_outline;
        let handle_style = self.options.styles.handle;
        let (Some(session), Some(surface)) = (self.vertex_edit.as_ref(), self.surface.as_mut())
        else {
            return;
        };
        let mut overlays = Vec::with_capacity(session.entries().len());
        for entry in session.entries() {
            let shape = entry.live_geometry();
            let outline = surface.add_overlay(shape.vertices(), &outline_style);
            let handles = entry
                .live()
                .iter()
                .map(|&vertex| surface.add_overlay(&[vertex], &handle_style))
                .collect();
            overlays.push(EntryOverlays { outline, handles });
        }
        self.edit_overlays = overlays;
    }

    /// Recreate one entry's handle set after a structural change so handle
    /// indices stay aligned with the vertex array; the outline is updated
    /// in place.
    fn rebuild_entry_overlays(&mut self, index: usize) {
        let handle_style = self.options.styles.handle;
        let (Some(session), Some(surface)) = (self.vertex_edit.as_ref(), self.surface.as_mut())
        else {
            return;
        };
        let (Some(entry), Some(overlays)) =
            (session.entries().get(index), self.edit_overlays.get_mut(index))
        else {
            return;
        };
        let shape = entry.live_geometry();
        surface.update_overlay(overlays.outline, shape.vertices());
        for handle in overlays.handles.drain(..) {
            surface.remove_overlay(handle);
        }
        overlays.handles = entry
            .live()
            .iter()
            .map(|&vertex| surface.add_overlay(&[vertex], &handle_style))
            .collect();
    }

    /// During a move drag only the dragged handle and the outline change;
    /// the handle set itself is structurally untouched.
    fn refresh_dragged_vertex(&mut self, at: VertexRef) {
        let (Some(session), Some(surface)) = (self.vertex_edit.as_ref(), self.surface.as_mut())
        else {
            return;
        };
        let (Some(entry), Some(overlays)) =
            (session.entries().get(at.entry), self.edit_overlays.get(at.entry))
        else {
            return;
        };
        let shape = entry.live_geometry();
        surface.update_overlay(overlays.outline, shape.vertices());
        if let (Some(&handle), Some(&vertex)) =
            (overlays.handles.get(at.vertex), entry.live().get(at.vertex))
        {
            surface.update_overlay(handle, &[vertex]);
        }
    }

    fn drop_drawing(&mut self) {
        if let Some(id) = self.drawing_overlay.take() {
            if let Some(surface) = self.surface.as_mut() {
                surface.remove_overlay(id);
            }
        }
        self.drawing = None;
    }

    fn drop_vertex_overlays(&mut self) {
        let overlays = std::mem::take(&mut self.edit_overlays);
        if let Some(surface) = self.surface.as_mut() {
            for entry in overlays {
                surface.remove_overlay(entry.outline);
                for handle in entry.handles {
                    surface.remove_overlay(handle);
                }
            }
        }
    }

    fn sweep_stale_outlines(&mut self) {
        let stale = std::mem::take(&mut self.stale_outlines);
        if let Some(surface) = self.surface.as_mut() {
            for id in stale {
                surface.remove_overlay(id);
            }
        }
    }
}
