//! Undo/redo history with time-windowed coalescing
//!
//! ```text
//! execute(a) t=0ms    undo: [a]
//! execute(b) t=100ms  undo: [{a, b}]        same kind within the window
//! execute(c) t=900ms  undo: [{a, b}, c]     window elapsed
//! undo()              steps c back, then redo: [c]
//! execute(d)          redo cleared
//! ```
//!
//! Undoing or redoing a composite is an explicit state machine: the composite
//! is parked in `stepping` and advanced one part per [`CommandEngine::step`]
//! call. It reaches the opposite stack only after its last part.

use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, span, trace, Level};

use super::{Command, CommandKind, CompositeCommand};
use crate::model::Model;

/// History behavior
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryConfig {
    /// Same-kind commands closer than this merge into one undo step
    pub coalesce_window: Duration,
    /// Pause between composite parts during undo/redo step-through
    pub step_delay: Duration,
    /// Maximum undo entries; the oldest are dropped
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            coalesce_window: Duration::from_millis(500),
            step_delay: Duration::from_millis(30),
            max_depth: 100,
        }
    }
}

impl HistoryConfig {
    pub fn with_coalesce_window(mut self, window: Duration) -> Self {
        self.coalesce_window = window;
        self
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }
}

/// Direction of a history move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Undo,
    Redo,
}

/// Result of an undo, redo or step call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepProgress {
    /// Nothing to do
    Idle,
    /// The history move finished
    Complete,
    /// A composite has `remaining` parts left
    Pending { remaining: usize },
}

#[derive(Debug)]
enum HistoryEntry {
    Single(Box<dyn Command>),
    Composite(CompositeCommand),
}

impl HistoryEntry {
    fn kind(&self) -> CommandKind {
        match self {
            HistoryEntry::Single(command) => command.kind(),
            HistoryEntry::Composite(composite) => composite.kind(),
        }
    }

    fn latest(&self) -> std::time::Instant {
        match self {
            HistoryEntry::Single(command) => command.timestamp(),
            HistoryEntry::Composite(composite) => composite.timestamp(),
        }
    }

    fn absorb(self, command: Box<dyn Command>) -> HistoryEntry {
        let mut composite = match self {
            HistoryEntry::Single(first) => CompositeCommand::new(first),
            HistoryEntry::Composite(composite) => composite,
        };
        composite.push(command);
        HistoryEntry::Composite(composite)
    }
}

/// A composite being stepped through
#[derive(Debug)]
struct Stepping {
    composite: CompositeCommand,
    direction: Direction,
    done: usize,
    generation: u64,
}

/// Undo and redo stacks for one model
#[derive(Debug, Default)]
pub struct CommandEngine {
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    stepping: Option<Stepping>,
    generation: u64,
    config: HistoryConfig,
}

impl CommandEngine {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Execute a command and record it, coalescing with the previous entry
    pub fn execute(&mut self, model: &mut Model, mut command: Box<dyn Command>) {
        let execute_span = span!(Level::DEBUG, "execute_command", kind = %command.kind());
        let _enter = execute_span.enter();

        self.finish_stepping(model);
        command.execute(model);
        self.redo_stack.clear();

        let merge = self.undo_stack.back().is_some_and(|last| {
            last.kind() == command.kind()
                && command
                    .timestamp()
                    .saturating_duration_since(last.latest())
                    <= self.config.coalesce_window
        });

        if merge {
            if let Some(last) = self.undo_stack.pop_back() {
                let merged = last.absorb(command);
                trace!("Coalesced with previous entry");
                self.undo_stack.push_back(merged);
            }
        } else {
            self.undo_stack.push_back(HistoryEntry::Single(command));
            while self.undo_stack.len() > self.config.max_depth {
                self.undo_stack.pop_front();
            }
        }
        debug!(undo_depth = self.undo_stack.len(), "Recorded command");
    }

    /// Start undoing the most recent entry
    ///
    /// Plain commands complete immediately. A composite applies its first
    /// part and returns [`StepProgress::Pending`] until stepped to the end.
    pub fn undo(&mut self, model: &mut Model) -> StepProgress {
        self.finish_stepping(model);
        match self.undo_stack.pop_back() {
            None => StepProgress::Idle,
            Some(HistoryEntry::Single(mut command)) => {
                command.unexecute(model);
                self.redo_stack.push(HistoryEntry::Single(command));
                StepProgress::Complete
            }
            Some(HistoryEntry::Composite(composite)) => {
                self.begin_stepping(composite, Direction::Undo);
                self.step(model)
            }
        }
    }

    /// Start redoing the most recently undone entry
    pub fn redo(&mut self, model: &mut Model) -> StepProgress {
        self.finish_stepping(model);
        match self.redo_stack.pop() {
            None => StepProgress::Idle,
            Some(HistoryEntry::Single(mut command)) => {
                command.execute(model);
                self.undo_stack.push_back(HistoryEntry::Single(command));
                StepProgress::Complete
            }
            Some(HistoryEntry::Composite(composite)) => {
                self.begin_stepping(composite, Direction::Redo);
                self.step(model)
            }
        }
    }

    /// Apply the next part of the composite being stepped through
    pub fn step(&mut self, model: &mut Model) -> StepProgress {
        let Some(stepping) = self.stepping.as_mut() else {
            return StepProgress::Idle;
        };
        let total = stepping.composite.len();
        let index = match stepping.direction {
            Direction::Undo => total - 1 - stepping.done,
            Direction::Redo => stepping.done,
        };
        if let Some(part) = stepping.composite.part_mut(index) {
            match stepping.direction {
                Direction::Undo => part.unexecute(model),
                Direction::Redo => part.execute(model),
            }
        }
        stepping.done += 1;
        trace!(direction = ?stepping.direction, index, total, "Stepped composite");

        let remaining = total - stepping.done;
        if remaining > 0 {
            return StepProgress::Pending { remaining };
        }
        if let Some(finished) = self.stepping.take() {
            let entry = HistoryEntry::Composite(finished.composite);
            match finished.direction {
                Direction::Undo => self.redo_stack.push(entry),
                Direction::Redo => self.undo_stack.push_back(entry),
            }
        }
        StepProgress::Complete
    }

    /// Step only if `generation` still names the composite in progress
    pub fn step_generation(&mut self, model: &mut Model, generation: u64) -> StepProgress {
        match &self.stepping {
            Some(stepping) if stepping.generation == generation => self.step(model),
            _ => StepProgress::Idle,
        }
    }

    /// Run every remaining part of an in-flight step-through
    pub fn finish_stepping(&mut self, model: &mut Model) {
        while let StepProgress::Pending { .. } = self.step(model) {}
    }

    /// Generation of the composite being stepped, if any
    pub fn stepping_generation(&self) -> Option<u64> {
        self.stepping.as_ref().map(|s| s.generation)
    }

    pub fn is_stepping(&self) -> bool {
        self.stepping.is_some()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Drop all history, finishing any step-through first
    pub fn clear(&mut self, model: &mut Model) {
        self.finish_stepping(model);
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn begin_stepping(&mut self, composite: CompositeCommand, direction: Direction) {
        self.generation += 1;
        debug!(?direction, parts = composite.len(), "Stepping through composite");
        self.stepping = Some(Stepping {
            composite,
            direction,
            done: 0,
            generation: self.generation,
        });
    }
}
