//! Pointer input events forwarded by the embedding application.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// A discrete pointer event on the map surface.
///
/// Every variant carries the position in both coordinate spaces: `screen`
/// for pixel-distance tests (snapping, handle hits) and `geo` for the
/// coordinate that ends up in feature geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    /// Single click: press and release without a drag.
    Click { screen: Point, geo: Point },
    /// Double click. While editing is active the surface's native
    /// double-click zoom is suppressed so this can finish a drawing.
    DoubleClick { screen: Point, geo: Point },
    /// Button press, the potential start of a vertex drag.
    Down { screen: Point, geo: Point },
    /// Pointer motion.
    Move { screen: Point, geo: Point },
    /// Button release, ending any vertex drag.
    Up { screen: Point, geo: Point },
}
