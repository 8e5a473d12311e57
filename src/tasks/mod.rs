//! Background task tracking: progress and cancellation channels for work
//! running off the interactive path, such as tagging runs.

pub mod manager;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use manager::BackgroundTaskManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

impl TaskId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        TaskId(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    /// A full pass over untagged library assets.
    Tagging,
}

impl TaskType {
    pub fn display_name(&self) -> &'static str {
        match self {
            TaskType::Tagging => "Photo Tagging",
        }
    }
}

/// Position within a run: `current` of `total`, optionally naming the asset.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskProgress {
    pub current: usize,
    pub total: usize,
    pub current_item: Option<String>,
}

impl TaskProgress {
    pub fn new(current: usize, total: usize) -> Self {
        Self {
            current,
            total,
            current_item: None,
        }
    }

    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.current_item = Some(item.into());
        self
    }

    /// Progress percentage (0-100).
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            0
        } else {
            ((self.current as f64 / self.total as f64) * 100.0).min(100.0) as u8
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Completed,
    Cancelled,
    Failed(String),
}

/// Messages a worker sends back about its task.
#[derive(Debug, Clone)]
pub enum TaskUpdate {
    Started { total: usize },
    Progress(TaskProgress),
    Completed { message: String },
    Cancelled,
    Failed { error: String },
}

pub struct BackgroundTask {
    pub id: TaskId,
    pub task_type: TaskType,
    pub state: TaskState,
    pub progress: Option<TaskProgress>,
    cancel_flag: Arc<AtomicBool>,
    receiver: mpsc::Receiver<TaskUpdate>,
    started_at: Instant,
}

impl BackgroundTask {
    fn new(task_type: TaskType, cancel_flag: Arc<AtomicBool>, receiver: mpsc::Receiver<TaskUpdate>) -> Self {
        Self {
            id: TaskId::next(),
            task_type,
            state: TaskState::Running,
            progress: None,
            cancel_flag,
            receiver,
            started_at: Instant::now(),
        }
    }

    /// Ask the worker to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn is_running(&self) -> bool {
        self.state == TaskState::Running
    }
}

/// A task that has reached a final state.
#[derive(Debug, Clone)]
pub struct TaskCompletionInfo {
    pub id: TaskId,
    pub task_type: TaskType,
    pub state: TaskState,
    pub message: String,
    pub elapsed: Duration,
}

impl TaskCompletionInfo {
    pub fn success(&self) -> bool {
        self.state == TaskState::Completed
    }
}
