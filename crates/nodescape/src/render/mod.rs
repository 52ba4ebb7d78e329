//! Tile addressing, caching and SVG rendering

mod cache;
mod svg;
mod tile;

pub use cache::*;
pub use svg::*;
pub use tile::*;

use anyhow::Result;
use kurbo::Rect;
use std::sync::Arc;
use tracing::trace;

use crate::core::ModelError;
use crate::model::Model;

impl Model {
    /// Markup for the viewport `view` at `zoom`, served from the tile cache
    /// when possible
    ///
    /// `view.origin()` is in world units, `view.size()` in screen pixels and
    /// `zoom` in world units per pixel.
    pub fn get_tile<R: TileRenderer + ?Sized>(
        &mut self,
        view: Rect,
        zoom: f64,
        renderer: &R,
    ) -> Result<Arc<Tile>> {
        if !(zoom.is_finite() && zoom > 0.0) {
            let message = format!("zoom must be positive and finite, got {}", zoom);
            return Err(ModelError::render_error(message).into());
        }
        if !view.is_finite() {
            let message = format!("viewport {:?} is not finite", view);
            return Err(ModelError::render_error(message).into());
        }
        if let Some(tile) = self.tiles.repeat(view, zoom) {
            return Ok(tile);
        }
        let key = TileKey::from_view(view, zoom);
        let tile = match self.tiles.try_get(&key) {
            Some(tile) => tile,
            None => {
                trace!(%key, "Tile cache miss");
                let svg = renderer.render(self, &key)?;
                let tile = Arc::new(Tile::new(key, svg));
                self.tiles.set_cached(key, Arc::clone(&tile));
                tile
            }
        };
        self.tiles.remember(view, zoom, Arc::clone(&tile));
        Ok(tile)
    }
}
