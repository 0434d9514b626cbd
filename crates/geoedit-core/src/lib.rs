//! GeoEdit Core Library
//!
//! Platform-agnostic editing engine for interactive vector features on
//! maps: drawing sessions for new polygon/line features, batch vertex
//! editing with snapping, and a host-confirmed cancelable delete protocol.
//!
//! The engine owns no rendering and no windowing. It draws previews
//! through the [`EditSurface`] trait, persists through the
//! [`FeatureStore`] trait, and notifies the embedding application through
//! the [`EditorHost`] trait; pointer input arrives as discrete
//! [`PointerEvent`]s.

pub mod coordinator;
pub mod drawing;
pub mod events;
pub mod feature;
pub mod input;
pub mod selection;
pub mod snap;
pub mod store;
pub mod surface;
pub mod vertex_edit;

pub use coordinator::{EditError, EditingCoordinator, EditorMode, EditorOptions};
pub use drawing::DrawingSession;
pub use events::{BoxFuture, DeleteDecision, EditorHost, HostError, NullHost};
pub use feature::{Feature, FeatureCollection, FeatureId, Geometry, GeometryKind};
pub use input::PointerEvent;
pub use selection::SelectionRegistry;
pub use snap::{nearest_edge, nearest_vertex, EdgeHit, SnapCandidate, DEFAULT_SNAP_DISTANCE_PX};
pub use store::{FeatureStore, MemoryStore};
pub use surface::{EditSurface, EditorStyles, OverlayId, OverlayKind, OverlayStyle};
pub use vertex_edit::{VertexEditSession, VertexEntry, VertexMode, VertexRef};
