//! Folder membership rows.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;

use super::Database;

/// An asset reference filed in a folder.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderAsset {
    pub id: i64,
    pub folder_id: i64,
    pub asset_identifier: String,
    pub sort_order: i64,
    pub added_at: DateTime<Utc>,
}

fn row_to_folder_asset(row: &rusqlite::Row) -> rusqlite::Result<FolderAsset> {
    Ok(FolderAsset {
        id: row.get(0)?,
        folder_id: row.get(1)?,
        asset_identifier: row.get(2)?,
        sort_order: row.get(3)?,
        added_at: row.get(4)?,
    })
}

impl Database {
    pub fn insert_folder_asset(&self, folder_id: i64, asset_identifier: &str, sort_order: i64) -> Result<FolderAsset> {
        let now = Utc::now();
        self.conn.execute(
            r#"
            INSERT INTO folder_assets (folder_id, asset_identifier, sort_order, added_at)
            VALUES (?, ?, ?, ?)
            "#,
            rusqlite::params![folder_id, asset_identifier, sort_order, now],
        )?;
        Ok(FolderAsset {
            id: self.conn.last_insert_rowid(),
            folder_id,
            asset_identifier: asset_identifier.to_string(),
            sort_order,
            added_at: now,
        })
    }

    pub fn get_folder_asset(&self, entry_id: i64) -> Result<Option<FolderAsset>> {
        let entry = self
            .conn
            .query_row(
                r#"
                SELECT id, folder_id, asset_identifier, sort_order, added_at
                FROM folder_assets WHERE id = ?
                "#,
                [entry_id],
                row_to_folder_asset,
            )
            .optional()?;
        Ok(entry)
    }

    /// Entries of a folder in display order.
    pub fn get_folder_assets(&self, folder_id: i64) -> Result<Vec<FolderAsset>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, folder_id, asset_identifier, sort_order, added_at
            FROM folder_assets
            WHERE folder_id = ?
            ORDER BY sort_order, id
            "#,
        )?;
        let entries = stmt
            .query_map([folder_id], row_to_folder_asset)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    pub fn next_asset_sort_order(&self, folder_id: i64) -> Result<i64> {
        let max: Option<i64> = self.conn.query_row(
            "SELECT MAX(sort_order) FROM folder_assets WHERE folder_id = ?",
            [folder_id],
            |row| row.get(0),
        )?;
        Ok(max.map_or(0, |m| m + 1))
    }

    pub fn set_asset_sort_order(&self, entry_id: i64, sort_order: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE folder_assets SET sort_order = ? WHERE id = ?",
            rusqlite::params![sort_order, entry_id],
        )?;
        Ok(())
    }

    pub fn set_asset_folder(&self, entry_id: i64, folder_id: i64, sort_order: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE folder_assets SET folder_id = ?, sort_order = ? WHERE id = ?",
            rusqlite::params![folder_id, sort_order, entry_id],
        )?;
        Ok(())
    }

    pub fn delete_folder_asset(&self, entry_id: i64) -> Result<bool> {
        let deleted = self.conn.execute("DELETE FROM folder_assets WHERE id = ?", [entry_id])?;
        Ok(deleted > 0)
    }

    pub fn count_folder_assets(&self, folder_id: i64) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM folder_assets WHERE folder_id = ?",
            [folder_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Entries whose folder row no longer exists. Always empty while foreign
    /// keys are enforced.
    pub fn count_orphaned_folder_assets(&self) -> Result<i64> {
        let count = self.conn.query_row(
            r#"
            SELECT COUNT(*) FROM folder_assets fa
            LEFT JOIN folders f ON f.id = fa.folder_id
            WHERE f.id IS NULL
            "#,
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_db;

    #[test]
    fn test_entries_follow_sort_order() {
        let db = test_db();
        let folder = db.insert_folder("Trip", None, 0).unwrap();
        db.insert_folder_asset(folder.id, "p2", 5).unwrap();
        db.insert_folder_asset(folder.id, "p1", 1).unwrap();

        let ids: Vec<String> = db
            .get_folder_assets(folder.id)
            .unwrap()
            .into_iter()
            .map(|a| a.asset_identifier)
            .collect();
        assert_eq!(ids, vec!["p1", "p2"]);
        assert_eq!(db.next_asset_sort_order(folder.id).unwrap(), 6);
    }

    #[test]
    fn test_deleting_folder_removes_entries() {
        let db = test_db();
        let folder = db.insert_folder("Trip", None, 0).unwrap();
        let child = db.insert_folder("Day 1", Some(folder.id), 0).unwrap();
        db.insert_folder_asset(folder.id, "p1", 0).unwrap();
        db.insert_folder_asset(child.id, "p2", 0).unwrap();

        db.delete_folder(folder.id).unwrap();
        assert_eq!(db.count_folder_assets(folder.id).unwrap(), 0);
        assert_eq!(db.count_folder_assets(child.id).unwrap(), 0);
        assert_eq!(db.count_orphaned_folder_assets().unwrap(), 0);
    }
}
