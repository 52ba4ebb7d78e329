//! Geometry helpers on top of `kurbo`
//!
//! Node containment is a chain of uniform scale + translate transforms, which
//! `kurbo::TranslateScale` models exactly: `(a * b) * p == a * (b * p)`.

use kurbo::{Point, Rect, Size, TranslateScale, Vec2};

/// Smallest denominator used in any ratio
pub const EPSILON: f64 = 1e-6;

/// Divide, clamping the denominator to [`EPSILON`]
#[inline]
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    numerator / denominator.max(EPSILON)
}

/// The identity transform
pub fn identity() -> TranslateScale {
    TranslateScale::new(Vec2::ZERO, 1.0)
}

/// Transform mapping a node's own local space into its parent's child space
pub fn placement(boundary: Rect) -> TranslateScale {
    TranslateScale::new(boundary.origin().to_vec2(), 1.0)
}

/// Transform mapping a node's child space into its own local space
pub fn container(zoom: f64, offset: Vec2) -> TranslateScale {
    TranslateScale::new(offset, zoom)
}

/// Apply a transform to a rectangle
pub fn map_rect(transform: TranslateScale, rect: Rect) -> Rect {
    let p0 = transform * Point::new(rect.x0, rect.y0);
    let p1 = transform * Point::new(rect.x1, rect.y1);
    Rect::from_points(p0, p1)
}

/// True if the rectangles share a region of positive area
pub fn overlaps(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && b.x0 < a.x1 && a.y0 < b.y1 && b.y0 < a.y1
}

/// True if `outer` fully contains `inner`
pub fn contains_rect(outer: Rect, inner: Rect) -> bool {
    outer.x0 <= inner.x0 && outer.y0 <= inner.y0 && outer.x1 >= inner.x1 && outer.y1 >= inner.y1
}

/// True if the rectangle has a usable, non-degenerate extent
pub fn is_placed(rect: Rect) -> bool {
    rect.width() > 0.0 && rect.height() > 0.0
}

/// Aspect ratio (width / height) with a clamped denominator
pub fn aspect(size: Size) -> f64 {
    safe_div(size.width, size.height)
}

/// Union of all rectangles, or `None` for an empty iterator
pub fn bounding_box(rects: impl IntoIterator<Item = Rect>) -> Option<Rect> {
    rects.into_iter().reduce(|acc, r| acc.union(r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_safe_div_clamps_zero() {
        assert_eq!(safe_div(1.0, 0.0), 1.0 / EPSILON);
        assert_eq!(safe_div(6.0, 3.0), 2.0);
    }

    #[test]
    fn test_overlap_excludes_touching_edges() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 20.0, 10.0);
        let c = Rect::new(5.0, 5.0, 15.0, 15.0);
        assert!(!overlaps(a, b));
        assert!(overlaps(a, c));
    }

    #[test]
    fn test_map_rect_scales_and_translates() {
        let t = container(0.5, Vec2::new(10.0, 20.0));
        let r = map_rect(t, Rect::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(r, Rect::new(10.0, 20.0, 60.0, 45.0));
    }

    #[test]
    fn test_bounding_box() {
        assert!(bounding_box(Vec::new()).is_none());
        let bb = bounding_box([
            Rect::new(0.0, 0.0, 1.0, 1.0),
            Rect::new(5.0, -2.0, 6.0, 3.0),
        ])
        .unwrap();
        assert_eq!(bb, Rect::new(0.0, -2.0, 6.0, 3.0));
    }

    proptest! {
        #[test]
        fn prop_transform_composition_is_associative(
            s1 in 0.01f64..10.0, s2 in 0.01f64..10.0, s3 in 0.01f64..10.0,
            x in -1000.0f64..1000.0, y in -1000.0f64..1000.0,
        ) {
            let a = container(s1, Vec2::new(x, y));
            let b = container(s2, Vec2::new(y, x));
            let c = container(s3, Vec2::new(x * 0.5, -y));
            let p = Point::new(x, y);
            let left = ((a * b) * c) * p;
            let right = (a * (b * c)) * p;
            prop_assert!((left - right).hypot() <= 1e-6 * (1.0 + left.to_vec2().hypot()));
        }
    }
}
