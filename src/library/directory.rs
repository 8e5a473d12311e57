use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use image::DynamicImage;
use std::fs::File;
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use super::{AssetHandle, PhotoLibrary, SortOrder};

/// A photo library backed by a directory tree.
///
/// Asset identifiers are paths relative to the root, with `/` separators.
pub struct DirectoryLibrary {
    root: PathBuf,
    extensions: Vec<String>,
}

impl DirectoryLibrary {
    pub fn new(root: impl Into<PathBuf>, extensions: &[String]) -> Self {
        Self {
            root: root.into(),
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    fn is_image(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.contains(&ext))
    }

    fn discover(&self) -> Vec<PathBuf> {
        WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.is_file() && self.is_image(p))
            .collect()
    }

    fn identifier_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    /// Resolve an identifier to a path inside the root. Identifiers that
    /// would escape the root resolve to nothing.
    fn resolve(&self, identifier: &str) -> Option<PathBuf> {
        let relative = Path::new(identifier);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        let path = self.root.join(relative);
        (path.is_file() && self.is_image(&path)).then_some(path)
    }
}

/// Capture date from EXIF `DateTimeOriginal`, else the file's modification time.
pub fn read_capture_date(path: &Path) -> Option<DateTime<Utc>> {
    exif_capture_date(path).or_else(|| {
        let modified = std::fs::metadata(path).ok()?.modified().ok()?;
        Some(DateTime::<Utc>::from(modified))
    })
}

fn exif_capture_date(path: &Path) -> Option<DateTime<Utc>> {
    let file = File::open(path).ok()?;
    let mut bufreader = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut bufreader).ok()?;
    let field = exif.get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)?;

    let exif::Value::Ascii(ref values) = field.value else {
        return None;
    };
    let dt = exif::DateTime::from_ascii(values.first()?).ok()?;

    NaiveDate::from_ymd_opt(dt.year as i32, dt.month as u32, dt.day as u32)?
        .and_hms_opt(dt.hour as u32, dt.minute as u32, dt.second as u32)
        .map(|naive| naive.and_utc())
}

impl PhotoLibrary for DirectoryLibrary {
    fn list_asset_identifiers(&self, order: SortOrder) -> Result<Vec<String>> {
        let mut dated: Vec<(Option<DateTime<Utc>>, String)> = self
            .discover()
            .into_iter()
            .filter_map(|path| {
                let identifier = self.identifier_for(&path)?;
                Some((read_capture_date(&path), identifier))
            })
            .collect();

        // Undated assets sort as oldest; identifiers break ties
        match order {
            SortOrder::NewestFirst => dated.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1))),
            SortOrder::OldestFirst => dated.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1))),
        }

        tracing::debug!(count = dated.len(), root = %self.root.display(), "Listed library assets");
        Ok(dated.into_iter().map(|(_, id)| id).collect())
    }

    fn fetch_asset(&self, identifier: &str) -> Option<AssetHandle> {
        let path = self.resolve(identifier)?;
        Some(AssetHandle::new(identifier, read_capture_date(&path)))
    }

    fn decoded_image(&self, asset: &AssetHandle) -> Option<DynamicImage> {
        let path = self.resolve(&asset.identifier)?;
        match image::open(&path) {
            Ok(img) => Some(img),
            Err(e) => {
                tracing::warn!(asset = %asset.identifier, error = %e, "Failed to decode image");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::fs::{self, File};
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    fn extensions() -> Vec<String> {
        vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()]
    }

    fn write_png(path: &Path, width: u32, height: u32, age_days: u64) {
        RgbImage::new(width, height).save(path).unwrap();
        let modified = SystemTime::now() - Duration::from_secs(age_days * 86_400);
        File::options().write(true).open(path).unwrap().set_modified(modified).unwrap();
    }

    #[test]
    fn test_lists_images_newest_first() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("2023")).unwrap();
        write_png(&dir.path().join("old.png"), 4, 4, 30);
        write_png(&dir.path().join("2023/new.png"), 4, 4, 1);
        write_png(&dir.path().join("mid.png"), 4, 4, 10);
        File::create(dir.path().join("notes.txt")).unwrap();

        let library = DirectoryLibrary::new(dir.path(), &extensions());

        let newest = library.list_asset_identifiers(SortOrder::NewestFirst).unwrap();
        assert_eq!(newest, vec!["2023/new.png", "mid.png", "old.png"]);

        let oldest = library.list_asset_identifiers(SortOrder::OldestFirst).unwrap();
        assert_eq!(oldest, vec!["old.png", "mid.png", "2023/new.png"]);
    }

    #[test]
    fn test_fetch_and_decode() {
        let dir = tempdir().unwrap();
        write_png(&dir.path().join("photo.png"), 40, 20, 0);
        let library = DirectoryLibrary::new(dir.path(), &extensions());

        let asset = library.fetch_asset("photo.png").unwrap();
        assert!(library.capture_date(&asset).is_some());

        let img = library.decoded_image(&asset).unwrap();
        assert_eq!((img.width(), img.height()), (40, 20));

        let thumb = library.thumbnail(&asset, 10).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (10, 5));
    }

    #[test]
    fn test_missing_or_escaping_identifiers() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("inner")).unwrap();
        write_png(&dir.path().join("outside.png"), 2, 2, 0);
        let library = DirectoryLibrary::new(dir.path().join("inner"), &extensions());

        assert!(library.fetch_asset("gone.png").is_none());
        assert!(library.fetch_asset("../outside.png").is_none());
        assert!(library.fetch_asset("/etc/passwd").is_none());
    }

    #[test]
    fn test_undecodable_file_yields_none() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.jpg"), b"not really a jpeg").unwrap();
        let library = DirectoryLibrary::new(dir.path(), &extensions());

        let asset = library.fetch_asset("broken.jpg").unwrap();
        assert!(library.decoded_image(&asset).is_none());
    }
}
