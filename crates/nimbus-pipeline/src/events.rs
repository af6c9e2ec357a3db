//! Run event stream for observability.
//!
//! Events are emitted on a [`tokio::sync::broadcast`] channel so observers
//! (the CLI progress printer, log sinks) can follow execution without
//! coupling to executor internals.

use serde::{Deserialize, Serialize};

/// Events emitted while a task graph executes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunEvent {
    RunStarted {
        task_count: usize,
    },
    TaskStarted {
        task_id: String,
    },
    TaskCompleted {
        task_id: String,
        duration_ms: u64,
    },
    TaskFailed {
        task_id: String,
        error: String,
    },
    RunCompleted {
        succeeded: usize,
        failed: usize,
        duration_ms: u64,
    },
}

/// Event emitter wrapping a broadcast sender.
#[derive(Clone)]
pub struct EventEmitter {
    sender: tokio::sync::broadcast::Sender<RunEvent>,
}

impl EventEmitter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all current subscribers; with no active receiver the
    /// event is silently dropped.
    pub fn emit(&self, event: RunEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(256)
    }
}
