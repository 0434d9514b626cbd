//! Rendering-surface collaborator interface.

use kurbo::Point;
use peniko::Color;

/// Opaque identifier for a temporary overlay shape, minted by the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayId(pub u64);

/// How an overlay should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    /// Polyline (or closed ring) through the given coordinates.
    Outline,
    /// A vertex handle marker at a single coordinate.
    Handle,
}

/// Visual style for a temporary overlay.
#[derive(Debug, Clone, Copy)]
pub struct OverlayStyle {
    pub kind: OverlayKind,
    pub stroke: Color,
    pub stroke_width: f64,
    pub fill: Option<Color>,
}

/// Styles for the engine's temporary shapes.
///
/// Presentation detail is configuration, not engine behavior: embedders
/// override these through [`EditorOptions`](crate::EditorOptions).
#[derive(Debug, Clone, Copy)]
pub struct EditorStyles {
    /// Open polyline previewing an in-progress drawing.
    pub drawing: OverlayStyle,
    /// Live outline of a feature under vertex editing.
    pub edit_outline: OverlayStyle,
    /// Draggable/clickable vertex handle.
    pub handle: OverlayStyle,
}

impl Default for EditorStyles {
    fn default() -> Self {
        Self {
            drawing: OverlayStyle {
                kind: OverlayKind::Outline,
                stroke: Color::from_rgba8(230, 74, 25, 255),
                stroke_width: 2.0,
                fill: None,
            },
            edit_outline: OverlayStyle {
                kind: OverlayKind::Outline,
                stroke: Color::from_rgba8(2, 136, 209, 255),
                stroke_width: 2.0,
                fill: None,
            },
            handle: OverlayStyle {
                kind: OverlayKind::Handle,
                stroke: Color::from_rgba8(2, 136, 209, 255),
                stroke_width: 1.5,
                fill: Some(Color::from_rgba8(255, 255, 255, 255)),
            },
        }
    }
}

/// The map rendering surface the engine draws previews on.
///
/// Implementations own pan/zoom, projection, and hit-visuals; the engine
/// only adds, updates, and removes temporary shapes and toggles the native
/// double-click zoom gesture. Coordinates handed to `add_overlay` and
/// `update_overlay` are geographic.
pub trait EditSurface {
    /// Project a geographic coordinate to screen pixels.
    fn project(&self, geo: Point) -> Point;

    /// Add a temporary shape, returning its handle.
    fn add_overlay(&mut self, coords: &[Point], style: &OverlayStyle) -> OverlayId;

    /// Replace the coordinates of an existing overlay.
    fn update_overlay(&mut self, id: OverlayId, coords: &[Point]);

    /// Remove a temporary shape.
    fn remove_overlay(&mut self, id: OverlayId);

    /// Enable or disable the surface's native double-click zoom gesture.
    fn set_double_click_zoom(&mut self, enabled: bool);
}
