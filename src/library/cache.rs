use anyhow::Result;
use chrono::{DateTime, Utc};
use image::DynamicImage;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::{AssetHandle, PhotoLibrary, SortOrder};

type CacheKey = (String, u32);

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, DynamicImage>,
    /// Least recently used at the front.
    recency: VecDeque<CacheKey>,
}

impl CacheState {
    fn promote(&mut self, key: &CacheKey) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            if let Some(k) = self.recency.remove(pos) {
                self.recency.push_back(k);
            }
        }
    }
}

/// Bounded in-memory thumbnail cache with least-recently-used eviction.
pub struct ThumbnailCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl ThumbnailCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn get(&self, identifier: &str, size: u32) -> Option<DynamicImage> {
        let mut state = self.state.lock().ok()?;
        let key = (identifier.to_string(), size);
        let image = state.entries.get(&key).cloned()?;
        state.promote(&key);
        Some(image)
    }

    pub fn insert(&self, identifier: &str, size: u32, image: DynamicImage) {
        if self.capacity == 0 {
            return;
        }
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        let key = (identifier.to_string(), size);
        if state.entries.insert(key.clone(), image).is_some() {
            state.promote(&key);
            return;
        }
        state.recency.push_back(key);
        while state.entries.len() > self.capacity {
            match state.recency.pop_front() {
                Some(evicted) => {
                    state.entries.remove(&evicted);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Wraps a library so thumbnails are served through a [`ThumbnailCache`].
pub struct CachedLibrary<L> {
    inner: L,
    cache: ThumbnailCache,
}

impl<L: PhotoLibrary> CachedLibrary<L> {
    pub fn new(inner: L, capacity: usize) -> Self {
        Self {
            inner,
            cache: ThumbnailCache::new(capacity),
        }
    }
}

impl<L: PhotoLibrary> PhotoLibrary for CachedLibrary<L> {
    fn list_asset_identifiers(&self, order: SortOrder) -> Result<Vec<String>> {
        self.inner.list_asset_identifiers(order)
    }

    fn fetch_asset(&self, identifier: &str) -> Option<AssetHandle> {
        self.inner.fetch_asset(identifier)
    }

    fn decoded_image(&self, asset: &AssetHandle) -> Option<DynamicImage> {
        self.inner.decoded_image(asset)
    }

    fn thumbnail(&self, asset: &AssetHandle, size: u32) -> Option<DynamicImage> {
        if let Some(cached) = self.cache.get(&asset.identifier, size) {
            return Some(cached);
        }
        let thumbnail = self.inner.thumbnail(asset, size)?;
        self.cache.insert(&asset.identifier, size, thumbnail.clone());
        Some(thumbnail)
    }

    fn capture_date(&self, asset: &AssetHandle) -> Option<DateTime<Utc>> {
        self.inner.capture_date(asset)
    }
}
