//! Thread-safe facade over one model and its command history
//!
//! A [`Canvas`] owns a [`Model`] and a [`CommandEngine`] behind a single
//! mutex. Every public operation locks once, does its work and releases the
//! lock before listeners are notified, so listeners may call back into the
//! canvas.
//!
//! Structure updates can be streamed from another thread with
//! [`Canvas::spawn_ingestion`]; each batch is applied under the lock on its
//! own so tiles can be served between batches.

use kurbo::{Point, Rect, Vec2};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, span, warn, Level};

use crate::command::{
    Command, CommandEngine, Direction, HistoryConfig, Scheduler, StepProgress, ThreadScheduler,
};
use crate::core::{Id, ModelError};
use crate::layout::LayoutConfig;
use crate::model::{Descriptor, Model, ModelStats, RemovalStats, Snapshot};
use crate::render::{RenderConfig, SvgRenderer, Tile};

/// Settings for every subsystem a canvas owns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanvasConfig {
    pub layout: LayoutConfig,
    pub render: RenderConfig,
    pub history: HistoryConfig,
}

impl CanvasConfig {
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_render(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }

    pub fn with_history(mut self, history: HistoryConfig) -> Self {
        self.history = history;
        self
    }
}

/// State change published to listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasEvent {
    /// The model changed; previously fetched tiles are stale
    Changed,
    /// One part of a composite undo/redo was applied
    StepApplied {
        direction: Direction,
        remaining: usize,
    },
    /// An ingestion batch was folded into the model
    BatchApplied { items: usize },
    /// Ingestion ended and obsolete items were removed
    IngestFinished { removed: RemovalStats },
}

type Listener = Arc<dyn Fn(&CanvasEvent) + Send + Sync>;

struct CanvasState {
    model: Model,
    engine: CommandEngine,
}

struct CanvasInner {
    state: Mutex<CanvasState>,
    scheduler: Arc<dyn Scheduler>,
    listeners: Mutex<Vec<Listener>>,
    renderer: SvgRenderer,
    step_delay: std::time::Duration,
}

/// Cloneable handle to a shared model
#[derive(Clone)]
pub struct Canvas {
    inner: Arc<CanvasInner>,
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

impl Canvas {
    /// Create an empty canvas that steps composites on background threads
    pub fn new(config: CanvasConfig) -> Self {
        Self::with_scheduler(config, Arc::new(ThreadScheduler))
    }

    /// Create an empty canvas driven by a custom scheduler
    pub fn with_scheduler(config: CanvasConfig, scheduler: Arc<dyn Scheduler>) -> Self {
        let mut model = Model::with_layout_config(config.layout.clone());
        model.tiles.set_capacity(config.render.cache_capacity);
        let state = CanvasState {
            model,
            engine: CommandEngine::new(config.history.clone()),
        };
        Self {
            inner: Arc::new(CanvasInner {
                state: Mutex::new(state),
                scheduler,
                listeners: Mutex::new(Vec::new()),
                renderer: SvgRenderer::new(config.render),
                step_delay: config.history.step_delay,
            }),
        }
    }

    /// Register a listener for state changes
    pub fn subscribe(&self, listener: impl Fn(&CanvasEvent) + Send + Sync + 'static) {
        lock(&self.inner.listeners).push(Arc::new(listener));
    }

    // ========================================================================
    // Read access
    // ========================================================================

    /// Run `f` against the model under the lock
    pub fn model<T>(&self, f: impl FnOnce(&Model) -> T) -> T {
        f(&self.state().model)
    }

    pub fn stats(&self) -> ModelStats {
        self.model(Model::stats)
    }

    /// Tile markup for a viewport; see [`Model::get_tile`]
    pub fn get_tile(&self, view: Rect, zoom: f64) -> anyhow::Result<Arc<Tile>> {
        let mut state = self.state();
        state.model.get_tile(view, zoom, &self.inner.renderer)
    }

    pub fn node_boundary(&self, id: Id) -> Option<Rect> {
        self.model(|model| model.node_boundary(id))
    }

    pub fn node_container(&self, id: Id) -> Option<(f64, Vec2)> {
        self.model(|model| model.node_container(id))
    }

    pub fn line_points(&self, id: Id) -> Option<Vec<Point>> {
        self.model(|model| model.line_points(id).map(<[Point]>::to_vec))
    }

    pub fn selected_nodes(&self) -> Vec<Id> {
        self.model(Model::selected_nodes)
    }

    // ========================================================================
    // Direct mutation
    // ========================================================================

    /// Run `f` against the model under the lock and publish a change
    pub fn update<T>(&self, f: impl FnOnce(&mut Model) -> T) -> T {
        let result = f(&mut self.state().model);
        self.notify(CanvasEvent::Changed);
        result
    }

    pub fn set_node_boundary(&self, id: Id, boundary: Rect) -> bool {
        self.mutate(|model| model.set_node_boundary(id, boundary))
    }

    pub fn set_node_container(&self, id: Id, zoom: f64, offset: Vec2) -> bool {
        self.mutate(|model| model.set_node_container(id, zoom, offset))
    }

    pub fn set_node_hidden(&self, id: Id, hidden: bool) -> bool {
        self.mutate(|model| model.set_node_hidden(id, hidden))
    }

    pub fn set_node_selected(&self, id: Id, selected: bool) -> bool {
        self.mutate(|model| model.set_node_selected(id, selected))
    }

    pub fn set_line_points(&self, id: Id, points: Vec<Point>) -> bool {
        self.mutate(|model| model.set_line_points(id, points))
    }

    /// Fold one batch into the model under a fresh stamp, without removal
    pub fn apply_batch(&self, batch: &[Descriptor]) {
        {
            let mut state = self.state();
            let stamp = state.model.begin_update();
            state.model.apply_batch(batch, stamp);
        }
        self.notify(CanvasEvent::BatchApplied { items: batch.len() });
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Execute and record an undoable command
    pub fn execute(&self, command: Box<dyn Command>) {
        {
            let mut state = self.state();
            let CanvasState { model, engine } = &mut *state;
            engine.execute(model, command);
        }
        self.notify(CanvasEvent::Changed);
    }

    /// Undo the most recent entry
    ///
    /// A coalesced entry applies its first part now; the remaining parts are
    /// applied by scheduled continuations, `step_delay` apart.
    pub fn undo(&self) -> StepProgress {
        self.move_history(Direction::Undo)
    }

    /// Redo the most recently undone entry
    pub fn redo(&self) -> StepProgress {
        self.move_history(Direction::Redo)
    }

    pub fn can_undo(&self) -> bool {
        self.state().engine.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.state().engine.can_redo()
    }

    pub fn is_stepping(&self) -> bool {
        self.state().engine.is_stepping()
    }

    fn move_history(&self, direction: Direction) -> StepProgress {
        let (progress, generation) = {
            let mut state = self.state();
            let CanvasState { model, engine } = &mut *state;
            let progress = match direction {
                Direction::Undo => engine.undo(model),
                Direction::Redo => engine.redo(model),
            };
            (progress, engine.stepping_generation())
        };
        debug!(?direction, ?progress, "History move");
        self.publish_step(direction, progress, generation);
        progress
    }

    fn continue_step(&self, direction: Direction, generation: u64) {
        let progress = {
            let mut state = self.state();
            let CanvasState { model, engine } = &mut *state;
            engine.step_generation(model, generation)
        };
        self.publish_step(direction, progress, Some(generation));
    }

    fn publish_step(&self, direction: Direction, progress: StepProgress, generation: Option<u64>) {
        match progress {
            StepProgress::Idle => {}
            StepProgress::Complete => {
                self.notify(CanvasEvent::StepApplied {
                    direction,
                    remaining: 0,
                });
                self.notify(CanvasEvent::Changed);
            }
            StepProgress::Pending { remaining } => {
                self.notify(CanvasEvent::StepApplied {
                    direction,
                    remaining,
                });
                if let Some(generation) = generation {
                    self.schedule_step(direction, generation);
                }
            }
        }
    }

    fn schedule_step(&self, direction: Direction, generation: u64) {
        let weak: Weak<CanvasInner> = Arc::downgrade(&self.inner);
        self.inner.scheduler.schedule(
            self.inner.step_delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    Canvas { inner }.continue_step(direction, generation);
                }
            }),
        );
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    pub fn snapshot(&self) -> Snapshot {
        self.model(Model::snapshot)
    }

    /// Replace the model contents with a snapshot and drop all history
    ///
    /// Nothing changes when the snapshot has an unsupported format version.
    pub fn restore(&self, snapshot: &Snapshot) -> Result<ModelStats, ModelError> {
        let stats = {
            let mut state = self.state();
            let CanvasState { model, engine } = &mut *state;
            engine.finish_stepping(model);
            let stats = model.restore(snapshot)?;
            engine.clear(model);
            stats
        };
        self.notify(CanvasEvent::Changed);
        Ok(stats)
    }

    // ========================================================================
    // Ingestion
    // ========================================================================

    /// Start a background pass that folds descriptor batches into the model
    ///
    /// All batches sent through the handle share one stamp. When the handle
    /// is finished, items not mentioned by any batch are removed.
    pub fn spawn_ingestion(&self) -> Result<IngestHandle, ModelError> {
        let stamp = self.state().model.begin_update();
        let (sender, receiver) = mpsc::channel();
        let weak = Arc::downgrade(&self.inner);
        let join = thread::Builder::new()
            .name("nodescape-ingest".to_string())
            .spawn(move || ingest(weak, receiver, stamp))?;
        info!(stamp, "Started ingestion");
        Ok(IngestHandle { sender, join })
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn state(&self) -> MutexGuard<'_, CanvasState> {
        lock(&self.inner.state)
    }

    fn mutate(&self, f: impl FnOnce(&mut Model) -> bool) -> bool {
        let changed = f(&mut self.state().model);
        if changed {
            self.notify(CanvasEvent::Changed);
        }
        changed
    }

    fn notify(&self, event: CanvasEvent) {
        let listeners: Vec<Listener> = lock(&self.inner.listeners).clone();
        for listener in listeners {
            listener(&event);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Summary of a finished ingestion pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestReport {
    pub batches: usize,
    pub items: usize,
    pub removed: RemovalStats,
    pub stats: ModelStats,
}

/// Sending side of a running ingestion pass
#[derive(Debug)]
pub struct IngestHandle {
    sender: Sender<Vec<Descriptor>>,
    join: JoinHandle<IngestReport>,
}

impl IngestHandle {
    /// Queue a batch; fails once the canvas has been dropped
    pub fn send(&self, batch: Vec<Descriptor>) -> anyhow::Result<()> {
        self.sender
            .send(batch)
            .map_err(|_| anyhow::anyhow!("ingestion thread has stopped"))
    }

    /// Additional sender for producers on other threads
    pub fn sender(&self) -> Sender<Vec<Descriptor>> {
        self.sender.clone()
    }

    /// Close the stream, wait for the remaining batches and remove obsolete
    /// items
    pub fn finish(self) -> anyhow::Result<IngestReport> {
        let IngestHandle { sender, join } = self;
        drop(sender);
        join.join()
            .map_err(|_| anyhow::anyhow!("ingestion thread panicked"))
    }
}

fn ingest(weak: Weak<CanvasInner>, receiver: Receiver<Vec<Descriptor>>, stamp: u64) -> IngestReport {
    let ingest_span = span!(Level::INFO, "ingest", stamp);
    let _enter = ingest_span.enter();

    let mut report = IngestReport::default();
    for batch in receiver {
        let Some(inner) = weak.upgrade() else {
            warn!("Canvas dropped during ingestion");
            return report;
        };
        let canvas = Canvas { inner };
        canvas.state().model.apply_batch(&batch, stamp);
        report.batches += 1;
        report.items += batch.len();
        canvas.notify(CanvasEvent::BatchApplied { items: batch.len() });
    }

    let Some(inner) = weak.upgrade() else {
        return report;
    };
    let canvas = Canvas { inner };
    {
        let mut state = canvas.state();
        report.removed = state.model.remove_obsolete(stamp);
        report.stats = state.model.stats();
    }
    info!(
        batches = report.batches,
        removed_nodes = report.removed.nodes,
        removed_links = report.removed.links,
        stats = %report.stats,
        "Ingestion finished"
    );
    canvas.notify(CanvasEvent::IngestFinished {
        removed: report.removed,
    });
    report
}
