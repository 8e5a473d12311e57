//! The folder/asset index: the user's folder tree and the ordered photo
//! references filed in each folder.
//!
//! Every structural operation runs as a single store transaction. Invalid
//! names are rejected before anything is written. References to folders or
//! entries that no longer exist are treated as no-ops (`Ok(false)`,
//! `Ok(None)`, `Ok(0)`), since callers work from lists that may lag behind
//! the store.

pub mod events;
pub mod ordering;

use std::collections::HashSet;
use std::sync::{mpsc, MutexGuard};

use chrono::Utc;
use tracing::{debug, info};

use crate::db::{self, Database, Folder, FolderAsset, FolderSortOption, SharedDb};
use crate::error::{IndexError, IndexResult};

pub use events::{EventBus, IndexEvent};

pub struct FolderIndex {
    db: SharedDb,
    events: EventBus,
}

/// Trim a folder name and reject it if nothing is left.
pub fn validate_folder_name(name: &str) -> IndexResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(IndexError::Validation("Folder name cannot be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Drop repeated identifiers, keeping the first occurrence of each.
fn unique_identifiers<S: AsRef<str>>(identifiers: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    identifiers
        .iter()
        .map(|id| id.as_ref().to_string())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

impl FolderIndex {
    pub fn new(db: SharedDb) -> Self {
        Self {
            db,
            events: EventBus::new(),
        }
    }

    /// Receive an event for every change made through this index.
    pub fn subscribe(&self) -> mpsc::Receiver<IndexEvent> {
        self.events.subscribe()
    }

    fn db(&self) -> IndexResult<MutexGuard<'_, Database>> {
        Ok(db::lock(&self.db)?)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn folder(&self, folder_id: i64) -> IndexResult<Option<Folder>> {
        Ok(self.db()?.get_folder(folder_id)?)
    }

    /// Children of `parent_id` (top level when `None`) in the requested order.
    pub fn list_folders(&self, parent_id: Option<i64>, sort: FolderSortOption) -> IndexResult<Vec<Folder>> {
        let mut folders = self.db()?.get_child_folders(parent_id)?;
        sort.apply(&mut folders);
        Ok(folders)
    }

    pub fn folder_assets(&self, folder_id: i64) -> IndexResult<Vec<FolderAsset>> {
        Ok(self.db()?.get_folder_assets(folder_id)?)
    }

    // ========================================================================
    // Folder operations
    // ========================================================================

    pub fn create_folder(&self, name: &str, parent_id: Option<i64>) -> IndexResult<Folder> {
        let name = validate_folder_name(name)?;
        let db = self.db()?;

        if let Some(parent) = parent_id {
            if db.get_folder(parent)?.is_none() {
                return Err(IndexError::NotFound { entity: "Folder", id: parent });
            }
        }

        let folder = db.transaction(|db| {
            let sort_order = db.next_folder_sort_order(parent_id)?;
            db.insert_folder(&name, parent_id, sort_order)
        })?;

        info!(folder_id = folder.id, name = %folder.name, "Created folder");
        self.events.emit(IndexEvent::FolderCreated { folder_id: folder.id, parent_id });
        Ok(folder)
    }

    pub fn rename_folder(&self, folder_id: i64, new_name: &str) -> IndexResult<bool> {
        let name = validate_folder_name(new_name)?;
        let renamed = self.db()?.rename_folder(folder_id, &name)?;
        if renamed {
            info!(folder_id, name = %name, "Renamed folder");
            self.events.emit(IndexEvent::FolderRenamed { folder_id });
        }
        Ok(renamed)
    }

    /// Delete a folder with all of its subfolders and entries.
    /// Returns how many folders were removed.
    pub fn delete_folder(&self, folder_id: i64) -> IndexResult<usize> {
        let removed = self.db()?.delete_folder(folder_id)?;
        if removed > 0 {
            info!(folder_id, removed, "Deleted folder");
            self.events.emit(IndexEvent::FolderDeleted { folder_id, removed });
        }
        Ok(removed)
    }

    /// Flip the favorite flag, returning the new value.
    pub fn toggle_favorite(&self, folder_id: i64) -> IndexResult<Option<bool>> {
        let db = self.db()?;
        let Some(folder) = db.get_folder(folder_id)? else {
            return Ok(None);
        };
        let is_favorite = !folder.is_favorite;
        db.set_folder_favorite(folder_id, is_favorite)?;
        self.events.emit(IndexEvent::FavoriteToggled { folder_id, is_favorite });
        Ok(Some(is_favorite))
    }

    /// Re-parent a folder, appending it to its new sibling group.
    ///
    /// Moving a folder into itself or any of its descendants is rejected.
    pub fn move_folder(&self, folder_id: i64, new_parent: Option<i64>) -> IndexResult<bool> {
        let db = self.db()?;
        let Some(folder) = db.get_folder(folder_id)? else {
            return Ok(false);
        };
        if folder.parent_id == new_parent {
            return Ok(false);
        }

        if let Some(parent) = new_parent {
            if db.get_folder(parent)?.is_none() {
                return Ok(false);
            }
            if db.get_subtree_folder_ids(folder_id)?.contains(&parent) {
                return Err(IndexError::InvalidMove(format!(
                    "Folder {} cannot be moved inside itself",
                    folder.name
                )));
            }
        }

        db.transaction(|db| {
            let sort_order = db.next_folder_sort_order(new_parent)?;
            db.set_folder_parent(folder_id, new_parent, sort_order)
        })?;

        info!(folder_id, ?new_parent, "Moved folder");
        self.events.emit(IndexEvent::FolderMoved { folder_id, parent_id: new_parent });
        Ok(true)
    }

    /// Move `source` into `target`'s slot among their shared siblings and
    /// renumber the group densely from zero.
    ///
    /// Reordering only means something under custom ordering, so the stored
    /// sort preference switches to custom as well.
    pub fn reorder_folder(&self, source_id: i64, target_id: i64) -> IndexResult<bool> {
        let db = self.db()?;
        let (Some(source), Some(target)) = (db.get_folder(source_id)?, db.get_folder(target_id)?) else {
            return Ok(false);
        };
        if source.id == target.id || source.parent_id != target.parent_id {
            return Ok(false);
        }

        let mut siblings = db.get_child_folders(source.parent_id)?;
        let (Some(source_index), Some(target_index)) = (
            siblings.iter().position(|f| f.id == source.id),
            siblings.iter().position(|f| f.id == target.id),
        ) else {
            return Ok(false);
        };

        let new_index = ordering::folder_insertion_index(source_index, target_index);

        db.transaction(|db| {
            let mut prefs = db.get_preferences()?;
            if prefs.folder_sort != FolderSortOption::Custom {
                prefs.folder_sort = FolderSortOption::Custom;
                db.save_preferences(&prefs)?;
            }
            if let Some(to) = new_index {
                ordering::move_element(&mut siblings, source_index, to);
                let now = Utc::now();
                for (position, folder) in siblings.iter().enumerate() {
                    db.set_folder_sort_order(folder.id, position as i64, now)?;
                }
            }
            Ok(())
        })?;

        if new_index.is_some() {
            debug!(source_id, target_id, "Reordered folders");
            self.events.emit(IndexEvent::FoldersReordered { parent_id: source.parent_id });
        }
        Ok(new_index.is_some())
    }

    // ========================================================================
    // Asset operations
    // ========================================================================

    /// File each identifier not already present at the end of the folder.
    /// Returns the number of entries created.
    pub fn add_assets<S: AsRef<str>>(&self, folder_id: i64, identifiers: &[S]) -> IndexResult<usize> {
        let db = self.db()?;
        if db.get_folder(folder_id)?.is_none() {
            return Ok(0);
        }

        let added = db.transaction(|db| {
            let present: HashSet<String> = db
                .get_folder_assets(folder_id)?
                .into_iter()
                .map(|a| a.asset_identifier)
                .collect();

            let mut sort_order = db.next_asset_sort_order(folder_id)?;
            let mut added = 0;
            for identifier in unique_identifiers(identifiers) {
                if present.contains(&identifier) {
                    continue;
                }
                db.insert_folder_asset(folder_id, &identifier, sort_order)?;
                sort_order += 1;
                added += 1;
            }
            db.touch_folder(folder_id)?;
            Ok(added)
        })?;

        debug!(folder_id, added, "Added assets to folder");
        self.events.emit(IndexEvent::AssetsChanged { folder_id });
        Ok(added)
    }

    pub fn remove_asset(&self, entry_id: i64) -> IndexResult<bool> {
        let db = self.db()?;
        let Some(entry) = db.get_folder_asset(entry_id)? else {
            return Ok(false);
        };

        db.transaction(|db| {
            db.delete_folder_asset(entry.id)?;
            db.touch_folder(entry.folder_id)
        })?;

        self.events.emit(IndexEvent::AssetsChanged { folder_id: entry.folder_id });
        Ok(true)
    }

    /// Move an entry into another folder. If the target already holds the
    /// same asset, the moved entry is dropped instead of duplicated.
    pub fn move_asset(&self, entry_id: i64, target_folder_id: i64) -> IndexResult<bool> {
        let db = self.db()?;
        let Some(entry) = db.get_folder_asset(entry_id)? else {
            return Ok(false);
        };
        if entry.folder_id == target_folder_id || db.get_folder(target_folder_id)?.is_none() {
            return Ok(false);
        }

        db.transaction(|db| {
            let already_present = db
                .get_folder_assets(target_folder_id)?
                .iter()
                .any(|a| a.asset_identifier == entry.asset_identifier);

            if already_present {
                db.delete_folder_asset(entry.id)?;
            } else {
                let sort_order = db.next_asset_sort_order(target_folder_id)?;
                db.set_asset_folder(entry.id, target_folder_id, sort_order)?;
            }
            db.touch_folder(entry.folder_id)?;
            db.touch_folder(target_folder_id)
        })?;

        self.events.emit(IndexEvent::AssetsChanged { folder_id: entry.folder_id });
        self.events.emit(IndexEvent::AssetsChanged { folder_id: target_folder_id });
        Ok(true)
    }

    /// Drop `source` next to `target` (before it or after it) and renumber
    /// the folder's entries densely from zero.
    pub fn reorder_asset(&self, source_id: i64, target_id: i64, insert_before: bool) -> IndexResult<bool> {
        let db = self.db()?;
        let (Some(source), Some(target)) = (db.get_folder_asset(source_id)?, db.get_folder_asset(target_id)?) else {
            return Ok(false);
        };
        if source.id == target.id || source.folder_id != target.folder_id {
            return Ok(false);
        }

        let mut entries = db.get_folder_assets(source.folder_id)?;
        let (Some(source_index), Some(target_index)) = (
            entries.iter().position(|a| a.id == source.id),
            entries.iter().position(|a| a.id == target.id),
        ) else {
            return Ok(false);
        };

        let Some(new_index) = ordering::asset_insertion_index(source_index, target_index, insert_before) else {
            return Ok(false);
        };
        ordering::move_element(&mut entries, source_index, new_index);

        db.transaction(|db| {
            for (position, entry) in entries.iter().enumerate() {
                db.set_asset_sort_order(entry.id, position as i64)?;
            }
            db.touch_folder(source.folder_id)
        })?;

        debug!(source_id, target_id, insert_before, "Reordered assets");
        self.events.emit(IndexEvent::AssetsChanged { folder_id: source.folder_id });
        Ok(true)
    }

    // ========================================================================
    // Drag-to-group
    // ========================================================================

    /// Create a child folder of `parent_id` and move the given assets into
    /// it, in the order given.
    pub fn create_subfolder_from_assets<S: AsRef<str>>(
        &self,
        parent_id: i64,
        name: &str,
        identifiers: &[S],
    ) -> IndexResult<Folder> {
        let name = validate_folder_name(name)?;
        let db = self.db()?;
        if db.get_folder(parent_id)?.is_none() {
            return Err(IndexError::NotFound { entity: "Folder", id: parent_id });
        }

        let subfolder = db.transaction(|db| {
            let sort_order = db.next_folder_sort_order(Some(parent_id))?;
            let subfolder = db.insert_folder(&name, Some(parent_id), sort_order)?;
            let parent_entries = db.get_folder_assets(parent_id)?;

            for (position, identifier) in unique_identifiers(identifiers).iter().enumerate() {
                db.insert_folder_asset(subfolder.id, identifier, position as i64)?;
                if let Some(existing) = parent_entries.iter().find(|a| &a.asset_identifier == identifier) {
                    db.delete_folder_asset(existing.id)?;
                }
            }
            db.touch_folder(parent_id)?;
            Ok(subfolder)
        })?;

        info!(folder_id = subfolder.id, parent_id, "Created subfolder from assets");
        self.events.emit(IndexEvent::FolderCreated { folder_id: subfolder.id, parent_id: Some(parent_id) });
        self.events.emit(IndexEvent::AssetsChanged { folder_id: parent_id });
        Ok(subfolder)
    }

    /// Create a top-level folder holding the given unfiled assets, as when
    /// one loose photo is dropped onto another.
    pub fn create_folder_from_loose_assets<S: AsRef<str>>(&self, name: &str, identifiers: &[S]) -> IndexResult<Folder> {
        let name = validate_folder_name(name)?;
        let db = self.db()?;

        let folder = db.transaction(|db| {
            let sort_order = db.next_folder_sort_order(None)?;
            let folder = db.insert_folder(&name, None, sort_order)?;
            for (position, identifier) in unique_identifiers(identifiers).iter().enumerate() {
                db.insert_folder_asset(folder.id, identifier, position as i64)?;
            }
            Ok(folder)
        })?;

        info!(folder_id = folder.id, "Created folder from loose assets");
        self.events.emit(IndexEvent::FolderCreated { folder_id: folder.id, parent_id: None });
        Ok(folder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    fn index() -> FolderIndex {
        FolderIndex::new(test_db().into_shared())
    }

    fn identifiers(index: &FolderIndex, folder_id: i64) -> Vec<String> {
        index
            .folder_assets(folder_id)
            .unwrap()
            .into_iter()
            .map(|a| a.asset_identifier)
            .collect()
    }

    fn sort_orders(index: &FolderIndex, folder_id: i64) -> Vec<i64> {
        index
            .folder_assets(folder_id)
            .unwrap()
            .into_iter()
            .map(|a| a.sort_order)
            .collect()
    }

    fn entry_id(index: &FolderIndex, folder_id: i64, identifier: &str) -> i64 {
        index
            .folder_assets(folder_id)
            .unwrap()
            .into_iter()
            .find(|a| a.asset_identifier == identifier)
            .unwrap()
            .id
    }

    #[test]
    fn test_create_folder_rejects_blank_names() {
        let index = index();
        assert!(matches!(index.create_folder("   ", None), Err(IndexError::Validation(_))));
        assert!(matches!(index.create_folder("", None), Err(IndexError::Validation(_))));
        assert!(index.list_folders(None, FolderSortOption::Custom).unwrap().is_empty());
    }

    #[test]
    fn test_create_folder_trims_and_appends() {
        let index = index();
        let a = index.create_folder("  Trip ", None).unwrap();
        let b = index.create_folder("Family", None).unwrap();
        let child = index.create_folder("Day 1", Some(a.id)).unwrap();

        assert_eq!(a.name, "Trip");
        assert_eq!(a.sort_order, 0);
        assert_eq!(b.sort_order, 1);
        assert_eq!(child.sort_order, 0);
        assert_eq!(child.parent_id, Some(a.id));
    }

    #[test]
    fn test_create_folder_under_missing_parent() {
        let index = index();
        assert!(matches!(
            index.create_folder("Orphan", Some(42)),
            Err(IndexError::NotFound { id: 42, .. })
        ));
    }

    #[test]
    fn test_rename_validates_and_updates() {
        let index = index();
        let folder = index.create_folder("Old", None).unwrap();

        assert!(matches!(index.rename_folder(folder.id, " "), Err(IndexError::Validation(_))));
        assert_eq!(index.folder(folder.id).unwrap().unwrap().name, "Old");

        assert!(index.rename_folder(folder.id, "New").unwrap());
        let renamed = index.folder(folder.id).unwrap().unwrap();
        assert_eq!(renamed.name, "New");
        assert!(renamed.updated_at >= folder.updated_at);

        assert!(!index.rename_folder(999, "Ghost").unwrap());
    }

    #[test]
    fn test_toggle_favorite() {
        let index = index();
        let folder = index.create_folder("Faves", None).unwrap();
        assert_eq!(index.toggle_favorite(folder.id).unwrap(), Some(true));
        assert_eq!(index.toggle_favorite(folder.id).unwrap(), Some(false));
        assert_eq!(index.toggle_favorite(999).unwrap(), None);
    }

    #[test]
    fn test_add_assets_is_idempotent() {
        let index = index();
        let folder = index.create_folder("Trip", None).unwrap();

        assert_eq!(index.add_assets(folder.id, &["p1", "p2"]).unwrap(), 2);
        assert_eq!(index.add_assets(folder.id, &["p2", "p3", "p3", "p1"]).unwrap(), 1);
        assert_eq!(index.add_assets(folder.id, &["p1"]).unwrap(), 0);

        assert_eq!(identifiers(&index, folder.id), vec!["p1", "p2", "p3"]);
        assert_eq!(sort_orders(&index, folder.id), vec![0, 1, 2]);
    }

    #[test]
    fn test_add_assets_to_missing_folder_is_noop() {
        let index = index();
        assert_eq!(index.add_assets(7, &["p1"]).unwrap(), 0);
    }

    #[test]
    fn test_remove_asset() {
        let index = index();
        let folder = index.create_folder("Trip", None).unwrap();
        index.add_assets(folder.id, &["p1", "p2"]).unwrap();
        let p1 = entry_id(&index, folder.id, "p1");

        assert!(index.remove_asset(p1).unwrap());
        assert!(!index.remove_asset(p1).unwrap());
        assert_eq!(identifiers(&index, folder.id), vec!["p2"]);
    }

    #[test]
    fn test_reorder_asset_moves_before_target() {
        let index = index();
        let folder = index.create_folder("Trip", None).unwrap();
        index.add_assets(folder.id, &["p1", "p2", "p3"]).unwrap();
        let p1 = entry_id(&index, folder.id, "p1");
        let p3 = entry_id(&index, folder.id, "p3");

        assert!(index.reorder_asset(p3, p1, true).unwrap());
        assert_eq!(identifiers(&index, folder.id), vec!["p3", "p1", "p2"]);
        assert_eq!(sort_orders(&index, folder.id), vec![0, 1, 2]);
    }

    #[test]
    fn test_reorder_asset_moves_rightward_after_target() {
        let index = index();
        let folder = index.create_folder("Trip", None).unwrap();
        index.add_assets(folder.id, &["p1", "p2", "p3", "p4"]).unwrap();
        let p1 = entry_id(&index, folder.id, "p1");
        let p3 = entry_id(&index, folder.id, "p3");

        assert!(index.reorder_asset(p1, p3, false).unwrap());
        assert_eq!(identifiers(&index, folder.id), vec!["p2", "p3", "p1", "p4"]);
        assert_eq!(sort_orders(&index, folder.id), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_reorder_asset_renumbers_sparse_orders() {
        let index = index();
        let folder = index.create_folder("Trip", None).unwrap();
        {
            let db = index.db().unwrap();
            db.insert_folder_asset(folder.id, "p1", 10).unwrap();
            db.insert_folder_asset(folder.id, "p2", 20).unwrap();
            db.insert_folder_asset(folder.id, "p3", 35).unwrap();
        }
        let p1 = entry_id(&index, folder.id, "p1");
        let p2 = entry_id(&index, folder.id, "p2");

        assert!(index.reorder_asset(p2, p1, true).unwrap());
        assert_eq!(identifiers(&index, folder.id), vec!["p2", "p1", "p3"]);
        assert_eq!(sort_orders(&index, folder.id), vec![0, 1, 2]);
    }

    #[test]
    fn test_reorder_asset_noops() {
        let index = index();
        let trip = index.create_folder("Trip", None).unwrap();
        let other = index.create_folder("Other", None).unwrap();
        index.add_assets(trip.id, &["p1", "p2"]).unwrap();
        index.add_assets(other.id, &["q1"]).unwrap();
        let p1 = entry_id(&index, trip.id, "p1");
        let p2 = entry_id(&index, trip.id, "p2");
        let q1 = entry_id(&index, other.id, "q1");

        assert!(!index.reorder_asset(p1, p1, true).unwrap());
        assert!(!index.reorder_asset(p1, 999, true).unwrap());
        assert!(!index.reorder_asset(p1, q1, true).unwrap());
        // Already directly before p2
        assert!(!index.reorder_asset(p1, p2, true).unwrap());
        assert_eq!(identifiers(&index, trip.id), vec!["p1", "p2"]);
    }

    #[test]
    fn test_reorder_folder_renumbers_and_switches_to_custom() {
        let index = index();
        {
            let db = index.db().unwrap();
            db.update_preferences(|p| p.folder_sort = FolderSortOption::Alphabetical).unwrap();
        }
        let a = index.create_folder("A", None).unwrap();
        index.create_folder("B", None).unwrap();
        let c = index.create_folder("C", None).unwrap();

        assert!(index.reorder_folder(a.id, c.id).unwrap());

        let folders = index.list_folders(None, FolderSortOption::Custom).unwrap();
        let names: Vec<&str> = folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C", "A"]);
        let orders: Vec<i64> = folders.iter().map(|f| f.sort_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);

        let prefs = index.db().unwrap().get_preferences().unwrap();
        assert_eq!(prefs.folder_sort, FolderSortOption::Custom);
    }

    #[test]
    fn test_reorder_folder_requires_shared_parent() {
        let index = index();
        let a = index.create_folder("A", None).unwrap();
        let nested = index.create_folder("Nested", Some(a.id)).unwrap();
        let b = index.create_folder("B", None).unwrap();

        assert!(!index.reorder_folder(nested.id, b.id).unwrap());
        assert!(!index.reorder_folder(a.id, a.id).unwrap());
        assert!(!index.reorder_folder(a.id, 999).unwrap());
    }

    #[test]
    fn test_delete_folder_cascades() {
        let index = index();
        let root = index.create_folder("Root", None).unwrap();
        let child = index.create_folder("Child", Some(root.id)).unwrap();
        let grandchild = index.create_folder("Grandchild", Some(child.id)).unwrap();
        let keep = index.create_folder("Keep", None).unwrap();
        index.add_assets(root.id, &["a"]).unwrap();
        index.add_assets(child.id, &["b"]).unwrap();
        index.add_assets(grandchild.id, &["c"]).unwrap();
        index.add_assets(keep.id, &["d"]).unwrap();

        assert_eq!(index.delete_folder(root.id).unwrap(), 3);

        let db = index.db().unwrap();
        let remaining: Vec<i64> = db.get_all_folders().unwrap().into_iter().map(|f| f.id).collect();
        assert_eq!(remaining, vec![keep.id]);
        for id in [root.id, child.id, grandchild.id] {
            assert_eq!(db.count_folder_assets(id).unwrap(), 0);
        }
        assert_eq!(db.count_orphaned_folder_assets().unwrap(), 0);
        assert_eq!(db.count_folder_assets(keep.id).unwrap(), 1);
        drop(db);

        assert_eq!(index.delete_folder(root.id).unwrap(), 0);
    }

    #[test]
    fn test_move_folder_rejects_cycles() {
        let index = index();
        let root = index.create_folder("Root", None).unwrap();
        let child = index.create_folder("Child", Some(root.id)).unwrap();
        let grandchild = index.create_folder("Grandchild", Some(child.id)).unwrap();

        assert!(matches!(index.move_folder(root.id, Some(grandchild.id)), Err(IndexError::InvalidMove(_))));
        assert!(matches!(index.move_folder(root.id, Some(root.id)), Err(IndexError::InvalidMove(_))));

        assert!(index.move_folder(grandchild.id, None).unwrap());
        let moved = index.folder(grandchild.id).unwrap().unwrap();
        assert_eq!(moved.parent_id, None);
        assert_eq!(moved.sort_order, 1);

        assert!(!index.move_folder(grandchild.id, None).unwrap());
    }

    #[test]
    fn test_move_asset_between_folders() {
        let index = index();
        let a = index.create_folder("A", None).unwrap();
        let b = index.create_folder("B", None).unwrap();
        index.add_assets(a.id, &["p1", "p2"]).unwrap();
        index.add_assets(b.id, &["p2"]).unwrap();

        let p1 = entry_id(&index, a.id, "p1");
        assert!(index.move_asset(p1, b.id).unwrap());
        assert_eq!(identifiers(&index, a.id), vec!["p2"]);
        assert_eq!(identifiers(&index, b.id), vec!["p2", "p1"]);

        // Duplicate in target: the moved entry is dropped
        let p2 = entry_id(&index, a.id, "p2");
        assert!(index.move_asset(p2, b.id).unwrap());
        assert!(identifiers(&index, a.id).is_empty());
        assert_eq!(identifiers(&index, b.id), vec!["p2", "p1"]);
    }

    #[test]
    fn test_create_subfolder_moves_assets() {
        let index = index();
        let parent = index.create_folder("Trip", None).unwrap();
        index.add_assets(parent.id, &["p1", "p2", "p3", "p4"]).unwrap();

        let sub = index
            .create_subfolder_from_assets(parent.id, "Beach", &["p3", "p1"])
            .unwrap();

        assert_eq!(sub.parent_id, Some(parent.id));
        assert_eq!(identifiers(&index, sub.id), vec!["p3", "p1"]);
        assert_eq!(sort_orders(&index, sub.id), vec![0, 1]);
        assert_eq!(identifiers(&index, parent.id), vec!["p2", "p4"]);

        let children = index.list_folders(Some(parent.id), FolderSortOption::Custom).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, sub.id);
    }

    #[test]
    fn test_create_subfolder_validates_before_writing() {
        let index = index();
        let parent = index.create_folder("Trip", None).unwrap();
        index.add_assets(parent.id, &["p1"]).unwrap();

        assert!(matches!(
            index.create_subfolder_from_assets(parent.id, "  ", &["p1"]),
            Err(IndexError::Validation(_))
        ));
        assert_eq!(identifiers(&index, parent.id), vec!["p1"]);
        assert!(index.list_folders(Some(parent.id), FolderSortOption::Custom).unwrap().is_empty());
    }

    #[test]
    fn test_create_folder_from_loose_assets() {
        let index = index();
        index.create_folder("Existing", None).unwrap();

        let folder = index.create_folder_from_loose_assets("New Folder", &["x", "y"]).unwrap();

        assert_eq!(folder.parent_id, None);
        assert_eq!(folder.sort_order, 1);
        assert_eq!(identifiers(&index, folder.id), vec!["x", "y"]);
        assert_eq!(index.list_folders(None, FolderSortOption::Custom).unwrap().len(), 2);
    }

    #[test]
    fn test_list_folders_sort_modes() {
        let index = index();
        let zeta = index.create_folder("zeta", None).unwrap();
        index.create_folder("Alpha", None).unwrap();
        index.create_folder("mid", None).unwrap();
        index.rename_folder(zeta.id, "zeta").unwrap();

        let names = |sort| -> Vec<String> {
            index.list_folders(None, sort).unwrap().into_iter().map(|f| f.name).collect()
        };
        assert_eq!(names(FolderSortOption::Custom), vec!["zeta", "Alpha", "mid"]);
        assert_eq!(names(FolderSortOption::Alphabetical), vec!["Alpha", "mid", "zeta"]);
        assert_eq!(names(FolderSortOption::Chronological), vec!["zeta", "Alpha", "mid"]);
        assert_eq!(names(FolderSortOption::MostRecent)[0], "zeta");
    }

    #[test]
    fn test_events_are_emitted() {
        let index = index();
        let events = index.subscribe();

        let folder = index.create_folder("Trip", None).unwrap();
        index.add_assets(folder.id, &["p1"]).unwrap();
        index.delete_folder(folder.id).unwrap();

        let received: Vec<IndexEvent> = events.try_iter().collect();
        assert_eq!(
            received,
            vec![
                IndexEvent::FolderCreated { folder_id: folder.id, parent_id: None },
                IndexEvent::AssetsChanged { folder_id: folder.id },
                IndexEvent::FolderDeleted { folder_id: folder.id, removed: 1 },
            ]
        );
    }
}
