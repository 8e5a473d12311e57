//! Turning raw classifier observations into tags.

use chrono::{DateTime, Local, Utc};

use crate::classifier::{Classification, FaceObservation, TextObservation};
use crate::db::{NewTag, TagType};

const OBJECT_MIN_CONFIDENCE: f64 = 0.5;
const OBJECT_MAX_TAGS: usize = 10;

const SCENE_MIN_CONFIDENCE: f64 = 0.3;
const SCENE_MAX_TAGS: usize = 3;
const SCENE_KEYWORDS: [&str; 18] = [
    "outdoor",
    "indoor",
    "beach",
    "mountain",
    "city",
    "forest",
    "restaurant",
    "office",
    "home",
    "park",
    "street",
    "sky",
    "water",
    "sunset",
    "night",
    "concert",
    "stadium",
    "museum",
];

const TEXT_MIN_CONFIDENCE: f64 = 0.5;
const TEXT_MIN_CHARS: usize = 3;
const TEXT_MAX_CHARS: usize = 50;
const TEXT_MAX_TAGS: usize = 5;
const TEXT_TAG_CONFIDENCE: f64 = 0.8;
const DOCUMENT_TAG_CONFIDENCE: f64 = 0.7;

fn clean_label(label: &str) -> String {
    label.replace('_', " ")
}

/// Highest-confidence first; ties keep the provider's order.
fn by_confidence(classifications: &[Classification]) -> Vec<&Classification> {
    let mut sorted: Vec<&Classification> = classifications.iter().collect();
    sorted.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    sorted
}

pub fn object_tags(asset_identifier: &str, classifications: &[Classification]) -> Vec<NewTag> {
    by_confidence(classifications)
        .into_iter()
        .filter(|c| c.confidence > OBJECT_MIN_CONFIDENCE)
        .take(OBJECT_MAX_TAGS)
        .map(|c| NewTag::new(asset_identifier, TagType::Object, clean_label(&c.label), c.confidence))
        .collect()
}

/// Labels naming a known kind of scene.
pub fn scene_tags(asset_identifier: &str, classifications: &[Classification]) -> Vec<NewTag> {
    by_confidence(classifications)
        .into_iter()
        .filter(|c| c.confidence > SCENE_MIN_CONFIDENCE)
        .filter(|c| {
            let label = c.label.to_lowercase();
            SCENE_KEYWORDS.iter().any(|k| label.contains(k))
        })
        .take(SCENE_MAX_TAGS)
        .map(|c| NewTag::new(asset_identifier, TagType::Scene, clean_label(&c.label), c.confidence))
        .collect()
}

/// One "person" tag at the top detection's confidence, plus a group tag
/// when more than one face is present.
pub fn face_tags(asset_identifier: &str, faces: &[FaceObservation]) -> Vec<NewTag> {
    let Some(top) = faces.iter().map(|f| f.confidence).reduce(f64::max) else {
        return Vec::new();
    };

    let mut tags = vec![NewTag::new(asset_identifier, TagType::Person, "person", top)];
    if faces.len() > 1 {
        tags.push(NewTag::new(
            asset_identifier,
            TagType::Person,
            format!("group ({} people)", faces.len()),
            1.0,
        ));
    }
    tags
}

/// Of the first few recognized lines, the short confident ones become text
/// tags; any of them surviving also marks the image as a document.
pub fn text_tags(asset_identifier: &str, lines: &[TextObservation]) -> Vec<NewTag> {
    let mut tags: Vec<NewTag> = lines
        .iter()
        .take(TEXT_MAX_TAGS)
        .filter(|l| l.confidence > TEXT_MIN_CONFIDENCE)
        .map(|l| l.text.trim())
        .filter(|text| (TEXT_MIN_CHARS..=TEXT_MAX_CHARS).contains(&text.chars().count()))
        .map(|text| NewTag::new(asset_identifier, TagType::Text, text, TEXT_TAG_CONFIDENCE))
        .collect();

    if !tags.is_empty() {
        tags.push(NewTag::new(asset_identifier, TagType::Object, "document", DOCUMENT_TAG_CONFIDENCE));
    }
    tags
}

/// Month and year of capture in local time, e.g. "March 2024".
pub fn date_tag(asset_identifier: &str, capture_date: Option<DateTime<Utc>>) -> Option<NewTag> {
    capture_date.map(|date| {
        let local = date.with_timezone(&Local);
        NewTag::new(asset_identifier, TagType::Date, local.format("%B %Y").to_string(), 1.0)
    })
}
