//! Line entity: one renderable hop shared by every link routed through it

use kurbo::Point;

use crate::core::Id;

/// Stroke width of a line carrying a single link
pub const BASE_STROKE_WIDTH: f64 = 1.0;
/// Width added per additional aggregated link
pub const STROKE_WIDTH_STEP: f64 = 0.5;
/// Upper bound for aggregated line width
pub const MAX_STROKE_WIDTH: f64 = 4.0;
/// Fixed width of user-authored direct lines
pub const DIRECT_STROKE_WIDTH: f64 = 2.0;

/// A renderable edge segment between two hop endpoints
#[derive(Debug, Clone)]
pub struct Line {
    pub id: Id,
    pub source: Id,
    pub target: Id,
    /// Links aggregated by this line
    pub links: Vec<Id>,
    /// User-edited middle points in the owner's child space
    pub points: Vec<Point>,
    /// User-authored shortcut that bypasses containment
    pub is_direct: bool,
}

impl Line {
    pub fn new(source: Id, target: Id, is_direct: bool) -> Self {
        let id = if is_direct {
            Id::for_direct_line(source, target)
        } else {
            Id::for_line(source, target)
        };
        Self {
            id,
            source,
            target,
            links: Vec::new(),
            points: Vec::new(),
            is_direct,
        }
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Stroke width: grows with the aggregated link count, capped
    pub fn stroke_width(&self) -> f64 {
        if self.is_direct {
            return DIRECT_STROKE_WIDTH;
        }
        let extra = self.links.len().saturating_sub(1) as f64;
        (BASE_STROKE_WIDTH + STROKE_WIDTH_STEP * extra).min(MAX_STROKE_WIDTH)
    }
}
