//! Tile cache owned by the model
//!
//! Entries are only ever dropped wholesale: on a tile pixel size change, when
//! the entry count would exceed capacity, and on model invalidation.

use kurbo::Rect;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use super::{Tile, TileKey};

/// Entry count above which the cache is wiped before inserting
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Counters for cache activity since creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Requests answered by the repeat-request shortcut
    pub repeats: u64,
    pub clears: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hits, {} misses, {} repeats, {} clears",
            self.hits, self.misses, self.repeats, self.clears
        )
    }
}

#[derive(Debug, Clone)]
struct LastRequest {
    view: Rect,
    zoom: f64,
    tile: Arc<Tile>,
}

#[derive(Debug)]
pub struct TileCache {
    tiles: HashMap<TileKey, Arc<Tile>>,
    /// Pixel size shared by every cached entry
    tile_size: Option<(u32, u32)>,
    last_request: Option<LastRequest>,
    capacity: usize,
    stats: CacheStats,
}

impl Default for TileCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl TileCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tiles: HashMap::new(),
            tile_size: None,
            last_request: None,
            capacity: capacity.max(1),
            stats: CacheStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// The previous tile if `(view, zoom)` repeats the previous request exactly
    pub fn repeat(&mut self, view: Rect, zoom: f64) -> Option<Arc<Tile>> {
        let last = self.last_request.as_ref()?;
        if last.view == view && last.zoom == zoom {
            self.stats.repeats += 1;
            Some(Arc::clone(&last.tile))
        } else {
            None
        }
    }

    /// Record the tile answered for a request
    pub fn remember(&mut self, view: Rect, zoom: f64, tile: Arc<Tile>) {
        self.last_request = Some(LastRequest { view, zoom, tile });
    }

    pub fn try_get(&mut self, key: &TileKey) -> Option<Arc<Tile>> {
        match self.tiles.get(key) {
            Some(tile) => {
                self.stats.hits += 1;
                trace!(%key, "Tile cache hit");
                Some(Arc::clone(tile))
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Store a tile, wiping the cache first if the pixel size changed or the
    /// cache is full
    pub fn set_cached(&mut self, key: TileKey, tile: Arc<Tile>) {
        if self.tile_size != Some(key.pixel_size()) {
            if !self.tiles.is_empty() {
                debug!(
                    old = ?self.tile_size,
                    new = ?key.pixel_size(),
                    "Tile size changed, wiping cache"
                );
                self.wipe();
            }
            self.tile_size = Some(key.pixel_size());
        } else if self.tiles.len() >= self.capacity {
            debug!(capacity = self.capacity, "Tile cache full, wiping");
            self.wipe();
        }
        self.tiles.insert(key, tile);
    }

    /// Drop every entry and the repeat-request shortcut
    pub fn clear(&mut self) {
        if !self.tiles.is_empty() {
            self.wipe();
        }
        self.last_request = None;
    }

    fn wipe(&mut self) {
        self.tiles.clear();
        self.stats.clears += 1;
    }
}
