//! Deferred world operations keyed by a logical tick time.
//!
//! Tasks are plain list entries: there is no task identity and therefore no
//! cancellation-by-handle. A task can only be stopped by another task
//! rebuilding the pending list before it becomes due.

use crate::error::KernelError;
use crate::world::World;
use std::fmt;
use std::sync::Arc;

/// The deferred operation itself.
pub type TaskOp = Arc<dyn Fn(&mut World) -> Result<(), KernelError> + Send + Sync>;

/// A deferred world-transforming operation.
#[derive(Clone)]
pub struct Task {
    /// Tick time at or after which the operation runs.
    pub scheduled_tick: u64,
    pub operation: TaskOp,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("scheduled_tick", &self.scheduled_tick)
            .finish_non_exhaustive()
    }
}

/// The pending task queue, in scheduling (insertion) order.
#[derive(Debug, Clone, Default)]
pub struct Tasks {
    queue: Vec<Task>,
}

impl Tasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, task: Task) {
        tracing::debug!(scheduled_tick = task.scheduled_tick, "task scheduled");
        self.queue.push(task);
    }

    /// Remove and return the tasks due at `tick`, ordered by scheduled tick
    /// ascending with ties broken by insertion order; later-scheduled tasks
    /// stay pending.
    pub fn take_due(&mut self, tick: u64) -> Vec<Task> {
        let queue = std::mem::take(&mut self.queue);
        let (mut due, pending): (Vec<Task>, Vec<Task>) = queue
            .into_iter()
            .partition(|task| task.scheduled_tick <= tick);
        self.queue = pending;
        // Stable: insertion order survives within equal scheduled ticks.
        due.sort_by_key(|task| task.scheduled_tick);
        due
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
