//! Image classification providers.
//!
//! Providers report raw observations. Deciding which of them become tags
//! (thresholds, caps, label cleanup) is the tagging pipeline's job.

mod vision;

use anyhow::Result;
use image::DynamicImage;

use crate::config::{ClassifierConfig, ClassifierProviderType, TaggingConfig};

pub use vision::VisionModelClassifier;

/// A label with the provider's confidence in it, 0.0 to 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub confidence: f64,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceObservation {
    pub confidence: f64,
}

/// One recognized line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextObservation {
    pub text: String,
    pub confidence: f64,
}

impl TextObservation {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Trait for providers that can analyse a decoded image.
///
/// Each call is independent; the tagging pipeline runs them concurrently
/// against the same image.
pub trait ImageClassifier: Send + Sync {
    /// General-purpose labels (objects and scenes).
    fn classify(&self, image: &DynamicImage) -> Result<Vec<Classification>>;

    fn detect_faces(&self, image: &DynamicImage) -> Result<Vec<FaceObservation>>;

    fn recognize_text(&self, image: &DynamicImage) -> Result<Vec<TextObservation>>;

    /// Get the provider name for display
    fn provider_name(&self) -> &'static str;
}

const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
const LMSTUDIO_ENDPOINT: &str = "http://127.0.0.1:1234/v1";
const OLLAMA_ENDPOINT: &str = "http://127.0.0.1:11434/v1";

fn resolve_endpoint(config: &ClassifierConfig) -> &str {
    match config.provider {
        ClassifierProviderType::LmStudio => config.endpoint.as_str(),
        ClassifierProviderType::OpenAI => OPENAI_ENDPOINT,
        // Ollama serves the same API on its own port
        ClassifierProviderType::Ollama if config.endpoint == LMSTUDIO_ENDPOINT => OLLAMA_ENDPOINT,
        ClassifierProviderType::Ollama => config.endpoint.as_str(),
    }
}

/// Create a classifier based on configuration
pub fn create_classifier(config: &ClassifierConfig, tagging: &TaggingConfig) -> Box<dyn ImageClassifier> {
    Box::new(
        VisionModelClassifier::new(resolve_endpoint(config), &config.model, config.api_key.as_deref())
            .with_timeout(config.timeout_secs)
            .with_max_dimension(tagging.max_image_dimension),
    )
}
