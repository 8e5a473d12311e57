//! Access to the photo library the index and tagger refer into.
//!
//! The core only ever holds asset identifiers; pixels and capture dates are
//! fetched on demand through [`PhotoLibrary`].

pub mod cache;
pub mod directory;

use anyhow::Result;
use chrono::{DateTime, Utc};
use image::DynamicImage;

pub use cache::{CachedLibrary, ThumbnailCache};
pub use directory::DirectoryLibrary;

/// Order in which asset identifiers are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// A resolved asset.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetHandle {
    pub identifier: String,
    pub capture_date: Option<DateTime<Utc>>,
}

impl AssetHandle {
    pub fn new(identifier: impl Into<String>, capture_date: Option<DateTime<Utc>>) -> Self {
        Self {
            identifier: identifier.into(),
            capture_date,
        }
    }
}

/// Source of assets, their pixels and their metadata.
///
/// Lookups return `None` rather than failing when an asset has disappeared
/// or cannot be decoded; callers skip such assets.
pub trait PhotoLibrary: Send + Sync {
    fn list_asset_identifiers(&self, order: SortOrder) -> Result<Vec<String>>;

    fn fetch_asset(&self, identifier: &str) -> Option<AssetHandle>;

    fn decoded_image(&self, asset: &AssetHandle) -> Option<DynamicImage>;

    fn thumbnail(&self, asset: &AssetHandle, size: u32) -> Option<DynamicImage> {
        self.decoded_image(asset).map(|img| img.thumbnail(size, size))
    }

    fn capture_date(&self, asset: &AssetHandle) -> Option<DateTime<Utc>> {
        asset.capture_date
    }
}
