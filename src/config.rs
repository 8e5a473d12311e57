use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub tagging: TaggingConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    #[serde(default = "default_library_root")]
    pub root: PathBuf,

    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    /// Maximum number of thumbnails held in memory.
    #[serde(default = "default_thumbnail_cache_capacity")]
    pub thumbnail_cache_capacity: usize,

    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,
}

fn default_library_root() -> PathBuf {
    dirs::picture_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Pictures")))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_image_extensions() -> Vec<String> {
    vec![
        "jpg".to_string(),
        "jpeg".to_string(),
        "png".to_string(),
        "gif".to_string(),
        "webp".to_string(),
        "bmp".to_string(),
        "tif".to_string(),
        "tiff".to_string(),
    ]
}

fn default_thumbnail_cache_capacity() -> usize {
    500
}

fn default_thumbnail_size() -> u32 {
    256
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: default_library_root(),
            image_extensions: default_image_extensions(),
            thumbnail_cache_capacity: default_thumbnail_cache_capacity(),
            thumbnail_size: default_thumbnail_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggingConfig {
    /// Pause between assets during a tagging run, in milliseconds.
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,

    /// Images are downscaled to fit this before classification.
    #[serde(default = "default_max_image_dimension")]
    pub max_image_dimension: u32,
}

fn default_throttle_ms() -> u64 {
    100
}

fn default_max_image_dimension() -> u32 {
    1024
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            throttle_ms: default_throttle_ms(),
            max_image_dimension: default_max_image_dimension(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierProviderType {
    #[default]
    LmStudio,
    OpenAI,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub provider: ClassifierProviderType,

    #[serde(default = "default_classifier_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_classifier_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_classifier_endpoint() -> String {
    "http://127.0.0.1:1234/v1".to_string()
}

fn default_classifier_model() -> String {
    "gemma-3-4b".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider: ClassifierProviderType::default(),
            endpoint: default_classifier_endpoint(),
            model: default_classifier_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fauxto")
        .join("fauxto.db")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            library: LibraryConfig::default(),
            tagging: TaggingConfig::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl Config {
    /// Load from `FAUXTO_CONFIG` if set, else the user config directory.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load from `path`, writing out the defaults if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fauxto")
    }

    fn config_path() -> PathBuf {
        match std::env::var_os("FAUXTO_CONFIG") {
            Some(path) => PathBuf::from(path),
            None => Self::config_dir().join("config.toml"),
        }
    }
}
