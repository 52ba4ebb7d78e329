//! Command-line interface for the nodescape utility
//!
//! Lays out and renders nodescape snapshots as SVG tiles.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing::{debug, info};

use nodescape::core::logging::init_logging;
use nodescape::layout::{Density, LayoutConfig};
use nodescape::model::{Model, Snapshot};
use nodescape::render::RenderConfig;
use nodescape::Id;

/// Nodescape - Render nested node maps as SVG tiles
#[derive(Parser)]
#[command(name = "nodescape")]
#[command(about = "Lay out and render nodescape snapshots as SVG tiles")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Set log level (trace|debug|info|warn|error)
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Set log format (compact|pretty|json)
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Log level options
#[derive(Copy, Clone, Debug, clap::ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format options
#[derive(Copy, Clone, Debug, clap::ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

/// Child spacing profiles
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq, Default)]
pub enum DensityChoice {
    Spacious,
    #[default]
    Balanced,
    Compact,
}

impl From<DensityChoice> for Density {
    fn from(value: DensityChoice) -> Self {
        match value {
            DensityChoice::Spacious => Density::Spacious,
            DensityChoice::Balanced => Density::Balanced,
            DensityChoice::Compact => Density::Compact,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render one viewport of a snapshot to SVG
    Render {
        /// Snapshot file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file for the SVG tile (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Viewport left edge in world units
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        x: f64,

        /// Viewport top edge in world units
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        y: f64,

        /// Tile width in pixels
        #[arg(long, default_value_t = 1024)]
        width: u32,

        /// Tile height in pixels
        #[arg(long, default_value_t = 768)]
        height: u32,

        /// World units per pixel (larger is further out)
        #[arg(long, default_value_t = 1.0)]
        zoom: f64,

        /// Child spacing profile
        #[arg(long, value_enum, default_value_t = DensityChoice::Balanced)]
        density: DensityChoice,
    },

    /// Check a snapshot's format version and print its contents
    Validate {
        /// Snapshot file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Lay out every node and print the resulting boundaries
    Layout {
        /// Snapshot file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Write the laid-out snapshot here instead of printing boundaries
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Child spacing profile
        #[arg(long, value_enum, default_value_t = DensityChoice::Balanced)]
        density: DensityChoice,

        /// Print boundaries as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Main CLI application
#[derive(Default)]
pub struct NodescapeApp {
    render_config: RenderConfig,
}

impl NodescapeApp {
    /// Create a new application instance with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the application with the given CLI arguments
    pub fn run(&self, cli: Cli) -> Result<()> {
        // Environment variables take precedence over flags
        let log_level_str = std::env::var("NODESCAPE_LOG_LEVEL")
            .ok()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .or_else(|| Some(cli.log_level.as_str().to_string()));

        let log_format_str = std::env::var("NODESCAPE_LOG_FORMAT")
            .ok()
            .or_else(|| Some(cli.log_format.as_str().to_string()));

        if let Err(e) = init_logging(log_level_str.as_deref(), log_format_str.as_deref()) {
            eprintln!("Warning: Failed to initialize logging: {}", e);
        }

        if cli.verbose {
            eprintln!("Nodescape v{}", env!("CARGO_PKG_VERSION"));
        }

        match cli.command {
            Commands::Render {
                input,
                output,
                x,
                y,
                width,
                height,
                zoom,
                density,
            } => {
                let view = kurbo::Rect::new(x, y, x + width as f64, y + height as f64);
                self.render_command(input, output, view, zoom, density, cli.verbose)
            }
            Commands::Validate { input } => self.validate_command(input, cli.verbose),
            Commands::Layout {
                input,
                output,
                density,
                json,
            } => self.layout_command(input, output, density, json, cli.verbose),
        }
    }

    /// Handle the render command
    fn render_command(
        &self,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        view: kurbo::Rect,
        zoom: f64,
        density: DensityChoice,
        verbose: bool,
    ) -> Result<()> {
        if !(zoom.is_finite() && zoom > 0.0) {
            return Err(anyhow!("Zoom must be a positive number, got {}", zoom));
        }
        let snapshot = self.read_snapshot(input)?;
        let layout = LayoutConfig::default().with_density(density.into());
        let svg = nodescape::render_snapshot(&snapshot, layout, self.render_config.clone(), view, zoom)?;

        if verbose {
            eprintln!("Rendered {} bytes of SVG", svg.len());
        }
        info!(bytes = svg.len(), zoom, "Rendered tile");
        self.write_output(output, &svg)
    }

    /// Handle the validate command
    fn validate_command(&self, input: Option<PathBuf>, verbose: bool) -> Result<()> {
        let content = self.read_input(input)?;

        if verbose {
            eprintln!("Read {} bytes of input", content.len());
        }

        let snapshot = match Snapshot::from_json(&content) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                println!("✗ Invalid snapshot: {}", e);
                return Err(e.into());
            }
        };

        let mut model = Model::new();
        let stats = model.restore(&snapshot)?;
        let dangling = snapshot
            .links
            .iter()
            .filter(|link| !snapshot.nodes.iter().any(|n| n.name == link.target))
            .count();
        debug!(dangling, "Counted links to undeclared nodes");

        println!(
            "✓ Valid snapshot (format {}): {}",
            snapshot.format_version, stats
        );
        if dangling > 0 {
            println!("  {} links point at undeclared nodes", dangling);
        }
        Ok(())
    }

    /// Handle the layout command
    fn layout_command(
        &self,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        density: DensityChoice,
        json: bool,
        verbose: bool,
    ) -> Result<()> {
        let snapshot = self.read_snapshot(input)?;
        let mut model = Model::with_layout_config(LayoutConfig::default().with_density(density.into()));
        model.restore(&snapshot)?;

        let containers = model.layout_all();
        if verbose {
            eprintln!("Laid out {} containers", containers);
        }

        if let Some(path) = output {
            let laid_out = model.snapshot();
            if path.to_string_lossy() == "-" {
                return self.write_output(None, &laid_out.to_json()?);
            }
            laid_out.save_to_path(&path)?;
            info!(path = %path.display(), "Wrote laid-out snapshot");
            return Ok(());
        }

        let rows: Vec<BoundaryRow> = model
            .descendants(Id::ROOT)
            .into_iter()
            .filter_map(|id| {
                let node = model.node(id)?;
                let rect = model.global_rect(id)?;
                Some(BoundaryRow {
                    name: node.name.clone(),
                    x: rect.x0,
                    y: rect.y0,
                    width: rect.width(),
                    height: rect.height(),
                    zoom: model.global_zoom(id)?,
                })
            })
            .collect();

        if json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        } else {
            for row in &rows {
                println!(
                    "{:<40} {:>10.2} {:>10.2} {:>10.2} {:>10.2}  zoom {:.4}",
                    row.name, row.x, row.y, row.width, row.height, row.zoom
                );
            }
        }
        Ok(())
    }

    fn read_snapshot(&self, input: Option<PathBuf>) -> Result<Snapshot> {
        let content = self.read_input(input)?;
        Snapshot::from_json(&content).map_err(|e| anyhow!("Failed to load snapshot: {}", e))
    }

    /// Read input from file or stdin
    pub fn read_input(&self, input: Option<PathBuf>) -> Result<String> {
        match input {
            Some(path) if path.to_string_lossy() != "-" => fs::read_to_string(&path)
                .map_err(|e| anyhow!("Failed to read input file '{}': {}", path.display(), e)),
            _ => {
                let mut content = String::new();
                io::stdin().read_to_string(&mut content)?;
                Ok(content)
            }
        }
    }

    /// Write output to file or stdout
    pub fn write_output(&self, output: Option<PathBuf>, content: &str) -> Result<()> {
        match output {
            Some(path) if path.to_string_lossy() != "-" => {
                fs::write(&path, content).map_err(|e| {
                    anyhow!("Failed to write output file '{}': {}", path.display(), e)
                })?;
            }
            _ => {
                let mut stdout = io::stdout();
                stdout.write_all(content.as_bytes())?;
                if !content.is_empty() && !content.ends_with('\n') {
                    stdout.write_all(b"\n")?;
                }
                stdout.flush()?;
            }
        }
        Ok(())
    }
}

/// Global placement of one node, as printed by `layout`
#[derive(Debug, serde::Serialize)]
struct BoundaryRow {
    name: String,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    zoom: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodescape::core::NodeType;
    use nodescape::model::{LinkDescriptor, NodeDescriptor};
    use tempfile::tempdir;

    fn sample_snapshot() -> Snapshot {
        let mut model = Model::new();
        let stamp = model.begin_update();
        model.apply_batch(
            &[
                NodeDescriptor::new("app", NodeType::Assembly).into(),
                NodeDescriptor::new("app.Main", NodeType::Type).into(),
                LinkDescriptor::new("app.Main", "lib.Log").into(),
            ],
            stamp,
        );
        model.snapshot()
    }

    #[test]
    fn test_cli_parsing_render_command() {
        let args = vec![
            "nodescape", "render", "--input", "map.json", "--output", "tile.svg", "--x", "-50",
            "--zoom", "2.5", "--density", "compact",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Render {
                input,
                output,
                x,
                y,
                width,
                height,
                zoom,
                density,
            } => {
                assert_eq!(input.unwrap().to_string_lossy(), "map.json");
                assert_eq!(output.unwrap().to_string_lossy(), "tile.svg");
                assert_eq!(x, -50.0);
                assert_eq!(y, 0.0);
                assert_eq!((width, height), (1024, 768));
                assert_eq!(zoom, 2.5);
                assert_eq!(density, DensityChoice::Compact);
            }
            _ => panic!("Expected Render command"),
        }
    }

    #[test]
    fn test_cli_parsing_layout_defaults() {
        let cli = Cli::try_parse_from(["nodescape", "layout"]).unwrap();
        match cli.command {
            Commands::Layout {
                input,
                output,
                density,
                json,
            } => {
                assert!(input.is_none());
                assert!(output.is_none());
                assert_eq!(density, DensityChoice::Balanced);
                assert!(!json);
            }
            _ => panic!("Expected Layout command"),
        }
        assert_eq!(cli.log_level, LogLevel::Info);
        assert_eq!(cli.log_format, LogFormat::Compact);
    }

    #[test]
    fn test_render_command_writes_svg() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("map.json");
        let output = dir.path().join("tile.svg");
        sample_snapshot().save_to_path(&input).unwrap();

        let app = NodescapeApp::new();
        app.render_command(
            Some(input),
            Some(output.clone()),
            kurbo::Rect::new(0.0, 0.0, 800.0, 600.0),
            1.0,
            DensityChoice::Balanced,
            false,
        )
        .unwrap();

        let svg = fs::read_to_string(&output).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(&Id::from_name("app").to_string()));
    }

    #[test]
    fn test_render_command_rejects_bad_zoom() {
        let app = NodescapeApp::new();
        let result = app.render_command(
            None,
            None,
            kurbo::Rect::new(0.0, 0.0, 10.0, 10.0),
            0.0,
            DensityChoice::Balanced,
            false,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_layout_command_writes_placed_snapshot() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("map.json");
        let output = dir.path().join("placed.json");
        sample_snapshot().save_to_path(&input).unwrap();

        let app = NodescapeApp::new();
        app.layout_command(Some(input), Some(output.clone()), DensityChoice::Spacious, false, false)
            .unwrap();

        let placed = Snapshot::load_from_path(&output).unwrap();
        assert_eq!(placed.nodes.len(), 4);
        assert!(placed.nodes.iter().all(|n| n.boundary.is_some()));
    }

    #[test]
    fn test_validate_rejects_future_version() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("map.json");
        let mut snapshot = sample_snapshot();
        snapshot.format_version = 99;
        fs::write(&input, serde_json::to_string(&snapshot).unwrap()).unwrap();

        let app = NodescapeApp::new();
        assert!(app.validate_command(Some(input), false).is_err());
    }

    #[test]
    fn test_write_output_to_file() {
        let app = NodescapeApp::new();
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("output.svg");

        app.write_output(Some(file_path.clone()), "<svg/>").unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "<svg/>");
    }
}
