//! Registry of background tasks and their update channels.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;

use super::{BackgroundTask, TaskCompletionInfo, TaskId, TaskProgress, TaskState, TaskType, TaskUpdate};

const WORKER_EXITED: &str = "worker exited";

pub struct BackgroundTaskManager {
    tasks: HashMap<TaskId, BackgroundTask>,
    /// Registration order, for stable listing.
    task_order: Vec<TaskId>,
}

impl BackgroundTaskManager {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            task_order: Vec::new(),
        }
    }

    /// Register a new background task.
    /// Returns its id plus the sender and cancel flag to hand to the worker.
    pub fn register_task(&mut self, task_type: TaskType) -> (TaskId, mpsc::Sender<TaskUpdate>, Arc<AtomicBool>) {
        let (tx, rx) = mpsc::channel();
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let task = BackgroundTask::new(task_type, cancel_flag.clone(), rx);
        let id = task.id;

        self.tasks.insert(id, task);
        self.task_order.push(id);

        (id, tx, cancel_flag)
    }

    pub fn cancel_task(&mut self, id: TaskId) -> bool {
        match self.tasks.get(&id) {
            Some(task) if task.is_running() => {
                task.cancel();
                true
            }
            _ => false,
        }
    }

    /// Drain every task's channel. Tasks that reached a final state are
    /// returned and stop being tracked. A worker that hangs up without a
    /// final update counts as failed.
    pub fn poll_updates(&mut self) -> Vec<TaskCompletionInfo> {
        let mut completed = Vec::new();

        for id in &self.task_order {
            let Some(task) = self.tasks.get_mut(id) else {
                continue;
            };

            loop {
                let update = match task.receiver.try_recv() {
                    Ok(update) => update,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => TaskUpdate::Failed {
                        error: WORKER_EXITED.to_string(),
                    },
                };
                let (state, message) = match update {
                    TaskUpdate::Started { total } => {
                        task.progress = Some(TaskProgress::new(0, total));
                        continue;
                    }
                    TaskUpdate::Progress(progress) => {
                        task.progress = Some(progress);
                        continue;
                    }
                    TaskUpdate::Completed { message } => (TaskState::Completed, message),
                    TaskUpdate::Cancelled => (TaskState::Cancelled, "Cancelled".to_string()),
                    TaskUpdate::Failed { error } => (TaskState::Failed(error.clone()), error),
                };

                task.state = state.clone();
                completed.push(TaskCompletionInfo {
                    id: *id,
                    task_type: task.task_type,
                    state,
                    message,
                    elapsed: task.elapsed(),
                });
                break;
            }
        }

        for info in &completed {
            self.tasks.remove(&info.id);
            self.task_order.retain(|id| *id != info.id);
        }

        completed
    }

    /// Running tasks in registration order.
    pub fn running_tasks(&self) -> Vec<&BackgroundTask> {
        self.task_order
            .iter()
            .filter_map(|id| self.tasks.get(id))
            .filter(|t| t.is_running())
            .collect()
    }

    pub fn has_running_tasks(&self) -> bool {
        self.tasks.values().any(|t| t.is_running())
    }
}

impl Default for BackgroundTaskManager {
    fn default() -> Self {
        Self::new()
    }
}
