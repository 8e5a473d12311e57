//! Change notifications for views that mirror the folder tree.

use std::sync::mpsc;
use std::sync::Mutex;

/// Something in the folder tree changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexEvent {
    FolderCreated { folder_id: i64, parent_id: Option<i64> },
    FolderRenamed { folder_id: i64 },
    FolderDeleted { folder_id: i64, removed: usize },
    FavoriteToggled { folder_id: i64, is_favorite: bool },
    FolderMoved { folder_id: i64, parent_id: Option<i64> },
    FoldersReordered { parent_id: Option<i64> },
    AssetsChanged { folder_id: i64 },
}

/// Fan-out of index events to any number of receivers.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<mpsc::Sender<IndexEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> mpsc::Receiver<IndexEvent> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(tx);
        }
        rx
    }

    /// Deliver `event` to every live subscriber, forgetting dropped ones.
    pub fn emit(&self, event: IndexEvent) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_reaches_all_subscribers() {
        let bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.emit(IndexEvent::FolderRenamed { folder_id: 3 });

        assert_eq!(a.try_recv().unwrap(), IndexEvent::FolderRenamed { folder_id: 3 });
        assert_eq!(b.try_recv().unwrap(), IndexEvent::FolderRenamed { folder_id: 3 });
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());

        bus.emit(IndexEvent::AssetsChanged { folder_id: 1 });
        bus.emit(IndexEvent::AssetsChanged { folder_id: 2 });

        assert_eq!(bus.subscribers.lock().unwrap().len(), 1);
        assert_eq!(kept.try_iter().count(), 2);
    }
}
