use anyhow::Result;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{analyze, detectors};
use crate::classifier::ImageClassifier;
use crate::db::{self, SharedDb};
use crate::library::{PhotoLibrary, SortOrder};
use crate::tasks::{TaskProgress, TaskUpdate};

/// Single-flight background tagger.
///
/// A run lists every library asset, skips those that already carry a tag,
/// and classifies the rest one at a time. Cloning gives another handle to
/// the same queue.
#[derive(Clone)]
pub struct TaggingQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    db: SharedDb,
    library: Arc<dyn PhotoLibrary>,
    classifier: Arc<dyn ImageClassifier>,
    throttle: Duration,
    is_processing: AtomicBool,
    processed: AtomicUsize,
    total: AtomicUsize,
    cancel_flag: Mutex<Option<Arc<AtomicBool>>>,
}

/// Resets the processing flag however the run ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn send(tx: &Option<mpsc::Sender<TaskUpdate>>, update: TaskUpdate) {
    if let Some(tx) = tx {
        let _ = tx.send(update);
    }
}

impl TaggingQueue {
    pub fn new(
        db: SharedDb,
        library: Arc<dyn PhotoLibrary>,
        classifier: Arc<dyn ImageClassifier>,
        throttle: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                db,
                library,
                classifier,
                throttle,
                is_processing: AtomicBool::new(false),
                processed: AtomicUsize::new(0),
                total: AtomicUsize::new(0),
                cancel_flag: Mutex::new(None),
            }),
        }
    }

    /// Start a run in the background. Returns `None` if one is already running.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        self.start_with(None, Arc::new(AtomicBool::new(false)))
    }

    /// Start a run that reports to `tx` and stops once `cancel_flag` is set.
    pub fn start_with(
        &self,
        tx: Option<mpsc::Sender<TaskUpdate>>,
        cancel_flag: Arc<AtomicBool>,
    ) -> Option<JoinHandle<()>> {
        if self
            .inner
            .is_processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Tagging already running");
            return None;
        }

        self.inner.processed.store(0, Ordering::SeqCst);
        self.inner.total.store(0, Ordering::SeqCst);
        if let Ok(mut slot) = self.inner.cancel_flag.lock() {
            *slot = Some(cancel_flag.clone());
        }

        let inner = Arc::clone(&self.inner);
        Some(thread::spawn(move || {
            let _guard = RunGuard(&inner.is_processing);
            inner.run(&tx, &cancel_flag);
        }))
    }

    /// Request that the current run stop after the asset in flight.
    pub fn stop(&self) {
        if let Ok(slot) = self.inner.cancel_flag.lock() {
            if let Some(flag) = slot.as_ref() {
                flag.store(true, Ordering::SeqCst);
            }
        }
    }

    pub fn is_processing(&self) -> bool {
        self.inner.is_processing.load(Ordering::SeqCst)
    }

    pub fn processed_count(&self) -> usize {
        self.inner.processed.load(Ordering::SeqCst)
    }

    pub fn total_count(&self) -> usize {
        self.inner.total.load(Ordering::SeqCst)
    }

    /// Fraction of the current (or last) run completed, 0.0 to 1.0.
    pub fn progress(&self) -> f64 {
        let total = self.total_count();
        if total == 0 {
            0.0
        } else {
            self.processed_count() as f64 / total as f64
        }
    }

    pub fn progress_description(&self) -> String {
        if !self.is_processing() {
            return "Ready".to_string();
        }
        format!("Processing {}/{}", self.processed_count(), self.total_count())
    }

    /// Tag one asset now, on the calling thread. With `replace`, the asset's
    /// existing tags are dropped first. Returns the number of tags written,
    /// or `None` if the asset or its image is unavailable.
    pub fn tag_asset(&self, identifier: &str, replace: bool) -> Result<Option<usize>> {
        self.inner.process_asset(identifier, replace)
    }
}

impl QueueInner {
    fn run(&self, tx: &Option<mpsc::Sender<TaskUpdate>>, cancel_flag: &AtomicBool) {
        let all = match self.library.list_asset_identifiers(SortOrder::NewestFirst) {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list library assets");
                send(tx, TaskUpdate::Failed { error: format!("Failed to list assets: {}", e) });
                return;
            }
        };

        // Snapshot; not refreshed during the run
        let tagged: HashSet<String> = match db::lock(&self.db).and_then(|db| db.get_tagged_identifiers()) {
            Ok(tagged) => tagged,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read tagged assets");
                send(tx, TaskUpdate::Failed { error: format!("Failed to read tags: {}", e) });
                return;
            }
        };

        let untagged: Vec<String> = all.into_iter().filter(|id| !tagged.contains(id)).collect();
        let total = untagged.len();
        self.total.store(total, Ordering::SeqCst);

        tracing::info!(total, already_tagged = tagged.len(), "Tagging run started");
        send(tx, TaskUpdate::Started { total });

        for (index, identifier) in untagged.iter().enumerate() {
            if cancel_flag.load(Ordering::SeqCst) {
                tracing::info!(processed = self.processed.load(Ordering::SeqCst), total, "Tagging run cancelled");
                send(tx, TaskUpdate::Cancelled);
                return;
            }

            send(tx, TaskUpdate::Progress(TaskProgress::new(index + 1, total).with_item(identifier)));

            match self.process_asset(identifier, false) {
                Ok(Some(count)) => tracing::debug!(asset = %identifier, tags = count, "Tagged asset"),
                Ok(None) => tracing::debug!(asset = %identifier, "Skipped unavailable asset"),
                Err(e) => tracing::error!(asset = %identifier, error = %e, "Failed to save tags"),
            }
            self.processed.fetch_add(1, Ordering::SeqCst);

            if index + 1 < total && !self.throttle.is_zero() {
                thread::sleep(self.throttle);
            }
        }

        if let Err(e) = db::lock(&self.db).and_then(|db| db.set_last_tagging_date(Utc::now())) {
            tracing::error!(error = %e, "Failed to record tagging date");
        }

        tracing::info!(total, "Tagging run finished");
        send(tx, TaskUpdate::Completed { message: format!("{} photos tagged", total) });
    }

    fn process_asset(&self, identifier: &str, replace: bool) -> Result<Option<usize>> {
        let Some(asset) = self.library.fetch_asset(identifier) else {
            return Ok(None);
        };
        let Some(image) = self.library.decoded_image(&asset) else {
            return Ok(None);
        };

        let mut tags = analyze(self.classifier.as_ref(), &image, identifier);
        tags.extend(detectors::date_tag(identifier, self.library.capture_date(&asset)));

        let db = db::lock(&self.db)?;
        let written = if replace {
            db.replace_tags_for_asset(identifier, &tags)?
        } else {
            db.insert_tags(&tags)?
        };
        Ok(Some(written))
    }
}
