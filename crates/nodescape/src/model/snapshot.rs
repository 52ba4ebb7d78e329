//! Versioned snapshot for the persistence layer
//!
//! A snapshot lists every node (parents before children) and every link by
//! name. Loading checks the format version before anything else; a mismatch
//! rejects the whole snapshot and the caller re-derives the model from source.

use kurbo::{Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, span, Level};

use super::{LinkDescriptor, Model, ModelStats, NodeDescriptor};
use crate::core::geometry::is_placed;
use crate::core::{Id, ModelError, NodeType};

/// Snapshot format understood by this build
pub const FORMAT_VERSION: u32 = 1;

/// Rectangle as stored on disk
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsRecord {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl From<Rect> for BoundsRecord {
    fn from(rect: Rect) -> Self {
        Self {
            x: rect.x0,
            y: rect.y0,
            width: rect.width(),
            height: rect.height(),
        }
    }
}

impl From<BoundsRecord> for Rect {
    fn from(record: BoundsRecord) -> Self {
        Rect::new(
            record.x,
            record.y,
            record.x + record.width,
            record.y + record.height,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    pub parent: String,
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary: Option<BoundsRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<(f64, f64)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub source: String,
    pub target: String,
    pub target_type: NodeType,
}

/// Serializable copy of the model structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: u32,
    pub nodes: Vec<NodeRecord>,
    pub links: Vec<LinkRecord>,
}

#[derive(Deserialize)]
struct VersionProbe {
    format_version: u32,
}

impl Snapshot {
    /// Capture the current model structure
    pub fn capture(model: &Model) -> Self {
        let mut nodes = Vec::new();
        for id in model.descendants(Id::ROOT) {
            let Some(node) = model.node(id) else {
                continue;
            };
            let parent = node
                .parent
                .and_then(|p| model.node(p))
                .map(|p| p.name.clone())
                .unwrap_or_default();
            let placed = is_placed(node.boundary);
            nodes.push(NodeRecord {
                name: node.name.clone(),
                parent,
                node_type: node.node_type,
                boundary: placed.then(|| node.boundary.into()),
                zoom: placed.then_some(node.container_zoom),
                offset: placed.then_some((node.container_offset.x, node.container_offset.y)),
                color: node.color.clone(),
                description: (!node.description.is_empty()).then(|| node.description.clone()),
            });
        }

        let mut links: Vec<LinkRecord> = model
            .links()
            .filter_map(|link| {
                let source = model.node(link.source)?;
                let target = model.node(link.target)?;
                Some(LinkRecord {
                    source: source.name.clone(),
                    target: target.name.clone(),
                    target_type: link.target_type,
                })
            })
            .collect();
        links.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));

        Self {
            format_version: FORMAT_VERSION,
            nodes,
            links,
        }
    }

    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a snapshot, rejecting it outright on a format version mismatch
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let probe: VersionProbe = serde_json::from_str(json)?;
        if probe.format_version != FORMAT_VERSION {
            return Err(ModelError::format_version(FORMAT_VERSION, probe.format_version));
        }
        Ok(serde_json::from_str(json)?)
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        fs::write(path.as_ref(), self.to_json()?)?;
        debug!(path = %path.as_ref().display(), "Saved snapshot");
        Ok(())
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let json = fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }
}

impl Model {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self)
    }

    /// Replace the model structure with the snapshot's contents
    ///
    /// Items missing from the snapshot are removed. Nodes stored with a
    /// boundary keep it; their parents only auto-place children that had none.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<ModelStats, ModelError> {
        if snapshot.format_version != FORMAT_VERSION {
            return Err(ModelError::format_version(FORMAT_VERSION, snapshot.format_version));
        }
        let restore_span = span!(Level::INFO, "restore_snapshot", nodes = snapshot.nodes.len());
        let _enter = restore_span.enter();

        let stamp = self.begin_update();
        for record in &snapshot.nodes {
            let mut descriptor =
                NodeDescriptor::new(record.name.clone(), record.node_type).with_parent(record.parent.clone());
            if let Some(boundary) = record.boundary {
                descriptor = descriptor.with_boundary(boundary.into());
            }
            if let Some(zoom) = record.zoom {
                descriptor = descriptor.with_zoom(zoom);
            }
            if let Some((x, y)) = record.offset {
                descriptor = descriptor.with_offset(Vec2::new(x, y));
            }
            if let Some(color) = &record.color {
                descriptor = descriptor.with_color(color.clone());
            }
            if let Some(description) = &record.description {
                descriptor = descriptor.with_description(description.clone());
            }
            self.add_or_update_node(&descriptor, stamp);
        }
        for record in &snapshot.links {
            let descriptor = LinkDescriptor::new(record.source.clone(), record.target.clone())
                .with_target_type(record.target_type);
            self.add_or_update_link(&descriptor, stamp);
        }
        self.remove_obsolete(stamp);

        let stats = self.stats();
        info!(%stats, "Restored snapshot");
        Ok(stats)
    }
}
