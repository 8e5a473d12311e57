//! Incremental classification of library assets into searchable tags.

pub mod detectors;
pub mod queue;

use anyhow::Result;
use image::DynamicImage;
use std::thread;

use crate::classifier::ImageClassifier;
use crate::db::NewTag;

pub use queue::TaggingQueue;

/// Log a failed detector and carry on with nothing from it.
fn or_empty<T>(result: Result<Vec<T>>, detector: &str, asset_identifier: &str) -> Vec<T> {
    result.unwrap_or_else(|e| {
        tracing::warn!(asset = %asset_identifier, detector, error = %e, "Detector failed");
        Vec::new()
    })
}

/// Run the four detectors against one image concurrently and collect their
/// tags. A failing detector contributes nothing; the others are unaffected.
pub fn analyze(classifier: &dyn ImageClassifier, image: &DynamicImage, asset_identifier: &str) -> Vec<NewTag> {
    thread::scope(|s| {
        let objects = s.spawn(|| {
            let labels = or_empty(classifier.classify(image), "objects", asset_identifier);
            detectors::object_tags(asset_identifier, &labels)
        });
        let faces = s.spawn(|| {
            let faces = or_empty(classifier.detect_faces(image), "faces", asset_identifier);
            detectors::face_tags(asset_identifier, &faces)
        });
        let text = s.spawn(|| {
            let lines = or_empty(classifier.recognize_text(image), "text", asset_identifier);
            detectors::text_tags(asset_identifier, &lines)
        });
        let scenes = s.spawn(|| {
            let labels = or_empty(classifier.classify(image), "scenes", asset_identifier);
            detectors::scene_tags(asset_identifier, &labels)
        });

        let mut tags = Vec::new();
        for (detector, handle) in [("objects", objects), ("faces", faces), ("text", text), ("scenes", scenes)] {
            match handle.join() {
                Ok(found) => tags.extend(found),
                Err(_) => tracing::warn!(asset = %asset_identifier, detector, "Detector panicked"),
            }
        }
        tags
    })
}
