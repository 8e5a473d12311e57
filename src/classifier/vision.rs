use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::time::Duration;

use super::{Classification, FaceObservation, ImageClassifier, TextObservation};

// ============================================================================
// OpenAI-compatible vision model (LM Studio, OpenAI, Ollama)
// ============================================================================

pub struct VisionModelClassifier {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
    max_dimension: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

// Shapes the prompts ask the model to answer in

#[derive(Debug, Deserialize)]
struct LabelsResponse {
    #[serde(default)]
    labels: Vec<LabelEntry>,
}

#[derive(Debug, Deserialize)]
struct LabelEntry {
    label: String,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct FacesResponse {
    #[serde(default)]
    faces: Vec<FaceEntry>,
}

#[derive(Debug, Deserialize)]
struct FaceEntry {
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct TextResponse {
    #[serde(default)]
    lines: Vec<TextEntry>,
}

#[derive(Debug, Deserialize)]
struct TextEntry {
    text: String,
    confidence: f64,
}

const LABELS_PROMPT: &str = "List the objects and the kind of scene visible in this image. \
     Use short lowercase labels such as \"dog\", \"beach\", \"sunset\" or \"restaurant\". \
     Respond with JSON only, in exactly this format:\n\
     {\"labels\": [{\"label\": \"dog\", \"confidence\": 0.92}]}";

const FACES_PROMPT: &str = "Count the human faces visible in this image. \
     Respond with JSON only, one entry per face, in exactly this format:\n\
     {\"faces\": [{\"confidence\": 0.95}]}\n\
     Use {\"faces\": []} if there are none.";

const TEXT_PROMPT: &str = "Transcribe every line of legible text in this image, one entry per line. \
     Respond with JSON only, in exactly this format:\n\
     {\"lines\": [{\"text\": \"OPEN 9-5\", \"confidence\": 0.8}]}\n\
     Use {\"lines\": []} if there is no text.";

impl VisionModelClassifier {
    pub fn new(endpoint: &str, model: &str, api_key: Option<&str>) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.map(|s| s.to_string()),
            timeout: Duration::from_secs(120),
            max_dimension: 1024,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    /// Send one prompt plus the image and return the model's reply text.
    fn complete(&self, prompt: &str, image: &DynamicImage) -> Result<String> {
        let data_url = encode_image(image, self.max_dimension)?;

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text { text: prompt.to_string() },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ],
            }],
            max_tokens: 500,
            temperature: 0.0,
        };

        let url = format!("{}/chat/completions", self.endpoint);

        let agent = ureq::AgentBuilder::new().timeout(self.timeout).build();

        let mut req = agent.post(&url).set("Content-Type", "application/json");

        if let Some(ref api_key) = self.api_key {
            req = req.set("Authorization", &format!("Bearer {}", api_key));
        }

        let response = req
            .send_json(&request)
            .map_err(|e| anyhow!("Classifier request failed: {}", e))?;

        let chat_response: ChatResponse = response
            .into_json()
            .map_err(|e| anyhow!("Failed to parse classifier response: {}", e))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("No response from classifier"))
    }
}

impl ImageClassifier for VisionModelClassifier {
    fn classify(&self, image: &DynamicImage) -> Result<Vec<Classification>> {
        let content = self.complete(LABELS_PROMPT, image)?;
        parse_labels(&content)
    }

    fn detect_faces(&self, image: &DynamicImage) -> Result<Vec<FaceObservation>> {
        let content = self.complete(FACES_PROMPT, image)?;
        parse_faces(&content)
    }

    fn recognize_text(&self, image: &DynamicImage) -> Result<Vec<TextObservation>> {
        let content = self.complete(TEXT_PROMPT, image)?;
        parse_text(&content)
    }

    fn provider_name(&self) -> &'static str {
        "OpenAI-compatible"
    }
}

/// Downscale to fit `max_dimension`, re-encode as JPEG and return a data URL.
fn encode_image(img: &DynamicImage, max_dimension: u32) -> Result<String> {
    let (width, height) = img.dimensions();
    let img = if width > max_dimension || height > max_dimension {
        img.resize(max_dimension, max_dimension, image::imageops::FilterType::Triangle)
    } else {
        img.clone()
    };

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, 85);
    rgb.write_with_encoder(encoder)
        .map_err(|e| anyhow!("Failed to encode image as JPEG: {}", e))?;

    Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(buf.into_inner())))
}

/// Extract JSON from a string that might contain markdown code blocks
fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();

    if trimmed.starts_with("```") {
        if let Some(start) = trimmed.find('\n') {
            let after_first_line = &trimmed[start + 1..];
            if let Some(end) = after_first_line.rfind("```") {
                return after_first_line[..end].trim();
            }
        }
    }

    trimmed
}

fn parse_reply<T: DeserializeOwned>(content: &str) -> Result<T> {
    serde_json::from_str(extract_json(content))
        .map_err(|e| anyhow!("Classifier returned malformed JSON: {}", e))
}

fn parse_labels(content: &str) -> Result<Vec<Classification>> {
    let response: LabelsResponse = parse_reply(content)?;
    Ok(response
        .labels
        .into_iter()
        .filter(|l| !l.label.trim().is_empty())
        .map(|l| Classification::new(l.label.trim(), l.confidence.clamp(0.0, 1.0)))
        .collect())
}

fn parse_faces(content: &str) -> Result<Vec<FaceObservation>> {
    let response: FacesResponse = parse_reply(content)?;
    Ok(response
        .faces
        .into_iter()
        .map(|f| FaceObservation {
            confidence: f.confidence.clamp(0.0, 1.0),
        })
        .collect())
}

fn parse_text(content: &str) -> Result<Vec<TextObservation>> {
    let response: TextResponse = parse_reply(content)?;
    Ok(response
        .lines
        .into_iter()
        .map(|l| TextObservation::new(l.text, l.confidence.clamp(0.0, 1.0)))
        .collect())
}
