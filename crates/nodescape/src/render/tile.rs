//! Tile addressing
//!
//! A viewport request is a rectangle whose origin is in world units and whose
//! size is in screen pixels, plus a zoom in world units per pixel (larger is
//! further out). It is quantized into a [`TileKey`]: the pixel size is rounded
//! up, the zoom snapped to one bucket per ~10% step and the origin snapped to
//! the tile grid at that zoom.

use kurbo::{Point, Rect, Size};
use std::fmt;

/// Ratio between adjacent discrete zoom levels
pub const ZOOM_FACTOR: f64 = 1.1;

/// Quantized address of a cached tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub x: i64,
    pub y: i64,
    pub zoom_level: i32,
    pub width: u32,
    pub height: u32,
}

impl TileKey {
    /// Quantize a viewport request
    pub fn from_view(view: Rect, zoom: f64) -> Self {
        let width = view.width().abs().ceil().max(1.0) as u32;
        let height = view.height().abs().ceil().max(1.0) as u32;
        let zoom = if zoom.is_finite() && zoom > 0.0 { zoom } else { 1.0 };
        let zoom_level = -(zoom.ln() / ZOOM_FACTOR.ln()).floor() as i32;
        let quantized = level_zoom(zoom_level);
        Self {
            x: (view.x0 / (quantized * width as f64)).round() as i64,
            y: (view.y0 / (quantized * height as f64)).round() as i64,
            zoom_level,
            width,
            height,
        }
    }

    /// World units per pixel at this key's zoom level
    pub fn quantized_zoom(&self) -> f64 {
        level_zoom(self.zoom_level)
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// World rectangle covered by this tile
    pub fn world_rect(&self) -> Rect {
        let zoom = self.quantized_zoom();
        let size = Size::new(zoom * self.width as f64, zoom * self.height as f64);
        let origin = Point::new(self.x as f64 * size.width, self.y as f64 * size.height);
        Rect::from_origin_size(origin, size)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}@{} ({}x{}px)",
            self.x, self.y, self.zoom_level, self.width, self.height
        )
    }
}

fn level_zoom(level: i32) -> f64 {
    ZOOM_FACTOR.powi(-level)
}

/// Rendered markup for one tile
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub key: TileKey,
    pub svg: String,
    /// World units per pixel used to render the markup
    pub zoom: f64,
    /// World position of the tile's top-left pixel
    pub offset: Point,
}

impl Tile {
    pub fn new(key: TileKey, svg: String) -> Self {
        Self {
            key,
            svg,
            zoom: key.quantized_zoom(),
            offset: key.world_rect().origin(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_unit_zoom_is_level_zero() {
        let key = TileKey::from_view(Rect::new(0.0, 0.0, 800.0, 600.0), 1.0);
        assert_eq!(key.zoom_level, 0);
        assert_eq!(key.quantized_zoom(), 1.0);
        assert_eq!(key.pixel_size(), (800, 600));
        assert_eq!((key.x, key.y), (0, 0));
    }

    #[test]
    fn test_pixel_size_rounds_up() {
        let key = TileKey::from_view(Rect::new(0.0, 0.0, 800.2, 599.5), 1.0);
        assert_eq!(key.pixel_size(), (801, 600));
    }

    #[test]
    fn test_nearby_zooms_share_a_level() {
        let a = TileKey::from_view(Rect::new(0.0, 0.0, 100.0, 100.0), 1.01);
        let b = TileKey::from_view(Rect::new(0.0, 0.0, 100.0, 100.0), 1.05);
        assert_eq!(a.zoom_level, b.zoom_level);
        let c = TileKey::from_view(Rect::new(0.0, 0.0, 100.0, 100.0), 1.25);
        assert_ne!(a.zoom_level, c.zoom_level);
    }

    #[test]
    fn test_origin_snaps_to_tile_grid() {
        let key = TileKey::from_view(Rect::new(1230.0, -410.0, 1630.0, -110.0), 1.0);
        assert_eq!((key.x, key.y), (3, -1));
        let world = key.world_rect();
        assert_eq!(world.origin(), Point::new(1200.0, -300.0));
        assert_eq!(world.size(), Size::new(400.0, 300.0));
    }

    #[test]
    fn test_degenerate_zoom_falls_back() {
        let key = TileKey::from_view(Rect::new(0.0, 0.0, 10.0, 10.0), 0.0);
        assert_eq!(key.zoom_level, 0);
    }

    proptest! {
        #[test]
        fn prop_key_is_pure(
            x in -1e6f64..1e6, y in -1e6f64..1e6,
            w in 1.0f64..4000.0, h in 1.0f64..4000.0,
            zoom in 0.001f64..1000.0,
        ) {
            let view = Rect::from_origin_size(Point::new(x, y), Size::new(w, h));
            prop_assert_eq!(TileKey::from_view(view, zoom), TileKey::from_view(view, zoom));
        }

        #[test]
        fn prop_quantized_zoom_brackets_request(zoom in 0.001f64..1000.0) {
            let key = TileKey::from_view(Rect::new(0.0, 0.0, 100.0, 100.0), zoom);
            let quantized = key.quantized_zoom();
            prop_assert!(quantized <= zoom * (1.0 + 1e-9));
            prop_assert!(quantized * ZOOM_FACTOR > zoom * (1.0 - 1e-9));
        }
    }
}
