//! Layout configuration
//!
//! The density profile is an explicit value carried by [`LayoutConfig`] and
//! threaded into the solver; nothing here is process-global.

use kurbo::Size;
use std::fmt;
use std::str::FromStr;

/// Weight of the empty-cell ratio in the column-count score
pub const EMPTY_CELL_PENALTY_WEIGHT: f64 = 0.5;

/// How tightly children are packed inside their parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Density {
    Spacious,
    #[default]
    Balanced,
    Compact,
}

impl Density {
    /// Multiplier applied to the metric gaps
    pub fn gap_scale(&self) -> f64 {
        match self {
            Density::Spacious => 1.5,
            Density::Balanced => 1.0,
            Density::Compact => 0.6,
        }
    }

    /// Target fraction of the parent area the content should occupy
    pub fn coverage(&self) -> f64 {
        match self {
            Density::Spacious => 0.55,
            Density::Balanced => 0.75,
            Density::Compact => 0.9,
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &["spacious", "balanced", "compact"]
    }
}

impl fmt::Display for Density {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Density::Spacious => "spacious",
            Density::Balanced => "balanced",
            Density::Compact => "compact",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Density {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "spacious" => Ok(Density::Spacious),
            "balanced" => Ok(Density::Balanced),
            "compact" => Ok(Density::Compact),
            _ => Err(format!(
                "Invalid density '{}'. Valid options: {}",
                s,
                Density::variants().join(", ")
            )),
        }
    }
}

/// Grid cell size and spacing for one class of children
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMetrics {
    pub cell: Size,
    pub gap_x: f64,
    pub gap_y: f64,
    /// Multiplier on the parent aspect; below 1 favors narrow grids
    pub aspect_bias: f64,
}

impl GridMetrics {
    /// Regular-size children
    pub const REGULAR: GridMetrics = GridMetrics {
        cell: Size::new(160.0, 120.0),
        gap_x: 40.0,
        gap_y: 40.0,
        aspect_bias: 1.0,
    };

    /// Small member rows inside a type
    pub const MEMBER: GridMetrics = GridMetrics {
        cell: Size::new(140.0, 24.0),
        gap_x: 8.0,
        gap_y: 4.0,
        aspect_bias: 0.5,
    };

    /// Gaps after applying a density profile
    pub fn gaps(&self, density: Density) -> (f64, f64) {
        let scale = density.gap_scale();
        (self.gap_x * scale, self.gap_y * scale)
    }

    /// Horizontal distance between the left edges of adjacent cells
    pub fn pitch_x(&self, density: Density) -> f64 {
        self.cell.width + self.gaps(density).0
    }

    /// Vertical distance between the top edges of adjacent cells
    pub fn pitch_y(&self, density: Density) -> f64 {
        self.cell.height + self.gaps(density).1
    }
}

/// Configuration for the grid layout solver
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub density: Density,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub regular: GridMetrics,
    pub member: GridMetrics,
    /// Candidate slots tried per child during incremental placement
    pub scan_limit: usize,
    /// Columns per lane during incremental placement
    pub lane_columns: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            density: Density::default(),
            min_zoom: 0.001,
            max_zoom: 1.0,
            regular: GridMetrics::REGULAR,
            member: GridMetrics::MEMBER,
            scan_limit: 64,
            lane_columns: 4,
        }
    }
}

impl LayoutConfig {
    pub fn with_density(mut self, density: Density) -> Self {
        self.density = density;
        self
    }

    pub fn with_zoom_band(mut self, min_zoom: f64, max_zoom: f64) -> Self {
        self.min_zoom = min_zoom.min(max_zoom);
        self.max_zoom = max_zoom.max(min_zoom);
        self
    }

    /// Metric for a child, by whether it is member-like
    pub fn metrics_for(&self, is_member: bool) -> &GridMetrics {
        if is_member {
            &self.member
        } else {
            &self.regular
        }
    }

    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}
