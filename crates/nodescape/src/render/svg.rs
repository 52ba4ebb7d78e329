//! SVG tile renderer
//!
//! Walks the node tree once per tile miss. Everything is emitted in tile
//! pixel coordinates; nesting of `<g>` blocks mirrors containment.

use anyhow::Result;
use kurbo::{Point, Rect, TranslateScale};
use std::collections::HashMap;
use std::fmt::Write;
use tracing::{debug, span, trace, Level};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::{TileKey, DEFAULT_CACHE_CAPACITY};
use crate::core::geometry::{contains_rect, container, is_placed, map_rect, overlaps, placement};
use crate::core::{Id, ModelError};
use crate::model::{Model, Node};

/// Core trait for tile renderers
pub trait TileRenderer {
    /// Render the markup for one tile
    ///
    /// Takes the model mutably because pending layouts run on demand.
    fn render(&self, model: &mut Model, key: &TileKey) -> Result<String>;
}

/// Rendering thresholds and cache sizing
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Nodes narrower than this (px) are drawn as an icon glyph
    pub glyph_threshold: f64,
    /// Nodes narrower than this (px) are not drawn at all
    pub min_visible_width: f64,
    /// Extra fraction of the tile added on each side for culling
    pub margin_factor: f64,
    /// Lines owned by a node narrower than this (px) are skipped
    pub line_threshold: f64,
    pub font_size: f64,
    /// Horizontal advance of one terminal column of label text (px)
    pub char_width: f64,
    pub cache_capacity: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            glyph_threshold: 40.0,
            min_visible_width: 1.5,
            margin_factor: 0.6,
            line_threshold: 80.0,
            font_size: 12.0,
            char_width: 7.0,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl RenderConfig {
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}

/// Renders tiles as standalone SVG documents
#[derive(Debug, Clone, Default)]
pub struct SvgRenderer {
    config: RenderConfig,
}

/// Per-render state
struct Walk<'a> {
    config: &'a RenderConfig,
    /// Margin rectangle in tile pixels
    margin: Rect,
    /// Line ids grouped by the node they are drawn in
    lines_by_owner: HashMap<Id, Vec<Id>>,
    svg: String,
    nodes_drawn: usize,
    lines_drawn: usize,
}

impl SvgRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }
}

impl TileRenderer for SvgRenderer {
    fn render(&self, model: &mut Model, key: &TileKey) -> Result<String> {
        let render_span = span!(Level::DEBUG, "render_tile", %key);
        let _enter = render_span.enter();

        let zoom = key.quantized_zoom();
        if !(zoom.is_finite() && zoom > 0.0) {
            return Err(ModelError::render_error(format!("tile {} has no usable zoom", key)).into());
        }
        let world = key.world_rect();
        let (width, height) = (key.width as f64, key.height as f64);
        let margin = Rect::new(0.0, 0.0, width, height)
            .inflate(width * self.config.margin_factor, height * self.config.margin_factor);
        let to_screen = TranslateScale::new(-world.origin().to_vec2() / zoom, 1.0 / zoom);

        // Layout must settle before line owners are grouped
        model.ensure_layout(Id::ROOT);

        let mut walk = Walk {
            config: &self.config,
            margin,
            lines_by_owner: group_lines_by_owner(model),
            svg: String::new(),
            nodes_drawn: 0,
            lines_drawn: 0,
        };

        let _ = write!(
            walk.svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
            w = key.width,
            h = key.height
        );
        walk.svg.push_str(STYLE);
        walk.render_level(model, Id::ROOT, to_screen, f64::INFINITY);
        walk.svg.push_str("</svg>");

        debug!(
            nodes = walk.nodes_drawn,
            lines = walk.lines_drawn,
            bytes = walk.svg.len(),
            "Rendered tile"
        );
        Ok(walk.svg)
    }
}

const STYLE: &str = "<style>.node rect{stroke:#5b6b7f;stroke-width:1}.node.selected rect{stroke:#e07b00;stroke-width:2}.label{font-family:sans-serif;fill:#1f2933}.line{fill:none;stroke:#7b8794}.line.direct{stroke-dasharray:4 2}.glyph{font-family:sans-serif;fill:#52606d}</style>";

impl Walk<'_> {
    /// Children and lines of `parent`; `to_screen` maps its child space, so
    /// `parent` must already be laid out
    fn render_level(&mut self, model: &mut Model, parent: Id, to_screen: TranslateScale, parent_width: f64) {
        let children = match model.node(parent) {
            Some(node) => node.children.clone(),
            None => return,
        };
        for child in children {
            self.render_node(model, child, to_screen);
        }
        if parent_width >= self.config.line_threshold {
            self.render_lines(model, parent, to_screen);
        }
    }

    fn render_node(&mut self, model: &mut Model, id: Id, parent_to_screen: TranslateScale) {
        let Some(node) = model.node(id) else {
            return;
        };
        if node.is_hidden() || !is_placed(node.boundary) {
            return;
        }
        let rect = map_rect(parent_to_screen, node.boundary);
        if !overlaps(rect, self.margin) || rect.width() < self.config.min_visible_width {
            return;
        }

        if rect.width() < self.config.glyph_threshold {
            self.render_glyph(node, rect);
            return;
        }

        // Layout may refit the container transform read below
        model.ensure_layout(id);
        let Some(node) = model.node(id) else {
            return;
        };
        let to_screen = parent_to_screen
            * placement(node.boundary)
            * container(node.container_zoom, node.container_offset);

        if contains_rect(rect, self.margin) {
            // The frame lies entirely outside the tile
            trace!(node = %id, "Skipping frame of enclosing node");
            self.render_level(model, id, to_screen, rect.width());
            return;
        }

        let class = if node.is_selected { "node selected" } else { "node" };
        let _ = write!(
            self.svg,
            "<g class=\"{} {}\" data-id=\"{}\">",
            class,
            node.node_type,
            node.id
        );
        let _ = write!(
            self.svg,
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"4\" fill=\"{}\"/>",
            rect.x0,
            rect.y0,
            rect.width(),
            rect.height(),
            escape_xml(node.fill_color())
        );
        let columns = ((rect.width() - 8.0) / self.config.char_width).floor().max(0.0) as usize;
        let label = truncate_to_width(node.label(), columns);
        if !label.is_empty() {
            let _ = write!(
                self.svg,
                "<text class=\"label\" x=\"{:.2}\" y=\"{:.2}\" font-size=\"{}\">{}</text>",
                rect.x0 + 4.0,
                rect.y0 + self.config.font_size + 2.0,
                self.config.font_size,
                escape_xml(&label)
            );
        }
        self.nodes_drawn += 1;
        self.render_level(model, id, to_screen, rect.width());
        self.svg.push_str("</g>");
    }

    fn render_glyph(&mut self, node: &Node, rect: Rect) {
        let icon = node.node_type.info().icon;
        let center = rect.center();
        let size = rect.width().min(rect.height()).max(1.0);
        let _ = write!(
            self.svg,
            "<text class=\"glyph {}\" data-id=\"{}\" x=\"{:.2}\" y=\"{:.2}\" font-size=\"{:.2}\" text-anchor=\"middle\"><title>{}</title>{}</text>",
            icon.class_name(),
            node.id,
            center.x,
            center.y + size * 0.35,
            size,
            escape_xml(&node.name),
            icon.glyph()
        );
        self.nodes_drawn += 1;
    }

    /// Lines drawn in `owner`'s child space
    fn render_lines(&mut self, model: &Model, owner: Id, to_screen: TranslateScale) {
        let Some(lines) = self.lines_by_owner.get(&owner) else {
            return;
        };
        let mut output = String::new();
        let mut drawn = 0;
        for line_id in lines {
            let Some(line) = model.line(*line_id) else {
                continue;
            };
            if model.is_line_hidden(line.id).unwrap_or(true) {
                continue;
            }
            let (Some(start), Some(end)) = (
                anchor(model, owner, line.source, Anchor::Source),
                anchor(model, owner, line.target, Anchor::Target),
            ) else {
                continue;
            };
            let mut points = Vec::with_capacity(line.points.len() + 2);
            points.push(to_screen * start);
            points.extend(line.points.iter().map(|p| to_screen * *p));
            points.push(to_screen * end);
            let extent = points
                .iter()
                .fold(Rect::from_points(points[0], points[0]), |r, p| r.union_pt(*p));
            if !overlaps(extent, self.margin) {
                continue;
            }

            let mut d = format!("M {:.2} {:.2}", points[0].x, points[0].y);
            for point in &points[1..] {
                let _ = write!(d, " L {:.2} {:.2}", point.x, point.y);
            }
            let class = if line.is_direct { "line direct" } else { "line" };
            let _ = write!(
                output,
                "<path class=\"{}\" data-id=\"{}\" d=\"{}\" stroke-width=\"{:.1}\"/>",
                class,
                line.id,
                d,
                line.stroke_width()
            );
            drawn += 1;
        }
        self.svg.push_str(&output);
        self.lines_drawn += drawn;
    }
}

#[derive(Clone, Copy)]
enum Anchor {
    Source,
    Target,
}

/// Endpoint of a line in `owner`'s child space
///
/// A descendant endpoint attaches at its bottom (source) or top (target)
/// center; the owner itself attaches at the opposite edge of its own frame.
fn anchor(model: &Model, owner: Id, endpoint: Id, side: Anchor) -> Option<Point> {
    if endpoint == owner {
        let frame = model.inner_rect(owner)?;
        let y = match side {
            Anchor::Source => frame.y0,
            Anchor::Target => frame.y1,
        };
        return Some(Point::new(frame.center().x, y));
    }
    let node = model.node(endpoint)?;
    if !is_placed(node.boundary) {
        return None;
    }
    let parent = node.parent?;
    let rect = map_rect(model.relative_child_transform(owner, parent)?, node.boundary);
    let y = match side {
        Anchor::Source => rect.y1,
        Anchor::Target => rect.y0,
    };
    Some(Point::new(rect.center().x, y))
}

fn group_lines_by_owner(model: &Model) -> HashMap<Id, Vec<Id>> {
    let mut grouped: HashMap<Id, Vec<Id>> = HashMap::new();
    for line in model.lines() {
        if let Some(owner) = model.line_owner(line.id) {
            grouped.entry(owner).or_default().push(line.id);
        }
    }
    for lines in grouped.values_mut() {
        lines.sort();
    }
    grouped
}

/// Cut `text` to at most `columns` terminal columns, marking the cut with `…`
pub fn truncate_to_width(text: &str, columns: usize) -> String {
    if text.width() <= columns {
        return text.to_string();
    }
    if columns == 0 {
        return String::new();
    }
    let mut result = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > columns {
            break;
        }
        result.push(ch);
        used += w;
    }
    result.push('…');
    result
}

pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_key_is_a_render_error() {
        let key = TileKey {
            x: 0,
            y: 0,
            zoom_level: 100_000,
            width: 256,
            height: 256,
        };
        let error = SvgRenderer::default().render(&mut Model::new(), &key).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<ModelError>(),
            Some(ModelError::RenderError { .. })
        ));
    }

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate_to_width("Node", 10), "Node");
        assert_eq!(truncate_to_width("Node", 4), "Node");
    }

    #[test]
    fn test_truncate_marks_cut() {
        assert_eq!(truncate_to_width("Renderer", 5), "Rend…");
        assert_eq!(truncate_to_width("Renderer", 0), "");
    }

    #[test]
    fn test_truncate_counts_wide_chars() {
        // Each CJK ideograph takes two columns
        assert_eq!(truncate_to_width("漢字漢字", 5), "漢字…");
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }
}
