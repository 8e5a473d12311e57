//! Folder rows and the queries over them.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};

use super::Database;

/// A user-defined folder.
///
/// Folders reference their parent by id; the child lists are derived by
/// querying, so the tree never holds live back-pointers.
#[derive(Debug, Clone, PartialEq)]
pub struct Folder {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub sort_order: i64,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How sibling folders are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderSortOption {
    #[default]
    Custom,
    Alphabetical,
    MostRecent,
    Chronological,
}

impl FolderSortOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            FolderSortOption::Custom => "custom",
            FolderSortOption::Alphabetical => "alphabetical",
            FolderSortOption::MostRecent => "most_recent",
            FolderSortOption::Chronological => "chronological",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "custom" => Some(FolderSortOption::Custom),
            "alphabetical" | "alpha" => Some(FolderSortOption::Alphabetical),
            "most_recent" | "recent" => Some(FolderSortOption::MostRecent),
            "chronological" | "oldest" => Some(FolderSortOption::Chronological),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FolderSortOption::Custom => "My Order",
            FolderSortOption::Alphabetical => "A-Z",
            FolderSortOption::MostRecent => "Most Recent",
            FolderSortOption::Chronological => "Oldest First",
        }
    }

    /// Sort a sibling group in place according to this option.
    pub fn apply(&self, folders: &mut [Folder]) {
        match self {
            FolderSortOption::Custom => {
                folders.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then(a.id.cmp(&b.id)))
            }
            FolderSortOption::Alphabetical => {
                folders.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            }
            FolderSortOption::MostRecent => folders.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
            FolderSortOption::Chronological => folders.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        }
    }
}

const FOLDER_COLUMNS: &str =
    "id, name, parent_id, sort_order, is_favorite, created_at, updated_at";

fn row_to_folder(row: &rusqlite::Row) -> rusqlite::Result<Folder> {
    Ok(Folder {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
        sort_order: row.get(3)?,
        is_favorite: row.get::<_, i64>(4)? == 1,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

impl Database {
    pub fn insert_folder(&self, name: &str, parent_id: Option<i64>, sort_order: i64) -> Result<Folder> {
        let now = Utc::now();
        self.conn.execute(
            r#"
            INSERT INTO folders (name, parent_id, sort_order, is_favorite, created_at, updated_at)
            VALUES (?, ?, ?, 0, ?, ?)
            "#,
            rusqlite::params![name, parent_id, sort_order, now, now],
        )?;
        Ok(Folder {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            parent_id,
            sort_order,
            is_favorite: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_folder(&self, folder_id: i64) -> Result<Option<Folder>> {
        let folder = self
            .conn
            .query_row(
                &format!("SELECT {} FROM folders WHERE id = ?", FOLDER_COLUMNS),
                [folder_id],
                row_to_folder,
            )
            .optional()?;
        Ok(folder)
    }

    /// Folders sharing `parent_id` (top level when `None`), in custom order.
    pub fn get_child_folders(&self, parent_id: Option<i64>) -> Result<Vec<Folder>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM folders WHERE parent_id IS ? ORDER BY sort_order, id",
            FOLDER_COLUMNS
        ))?;
        let folders = stmt
            .query_map([parent_id], row_to_folder)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(folders)
    }

    pub fn get_all_folders(&self) -> Result<Vec<Folder>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM folders ORDER BY parent_id, sort_order, id",
            FOLDER_COLUMNS
        ))?;
        let folders = stmt
            .query_map([], row_to_folder)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(folders)
    }

    /// The sort order a new folder appended to this sibling group should get.
    pub fn next_folder_sort_order(&self, parent_id: Option<i64>) -> Result<i64> {
        let max: Option<i64> = self.conn.query_row(
            "SELECT MAX(sort_order) FROM folders WHERE parent_id IS ?",
            [parent_id],
            |row| row.get(0),
        )?;
        Ok(max.map_or(0, |m| m + 1))
    }

    pub fn rename_folder(&self, folder_id: i64, name: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE folders SET name = ?, updated_at = ? WHERE id = ?",
            rusqlite::params![name, Utc::now(), folder_id],
        )?;
        Ok(changed > 0)
    }

    pub fn set_folder_favorite(&self, folder_id: i64, is_favorite: bool) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE folders SET is_favorite = ?, updated_at = ? WHERE id = ?",
            rusqlite::params![is_favorite as i64, Utc::now(), folder_id],
        )?;
        Ok(changed > 0)
    }

    pub fn set_folder_parent(&self, folder_id: i64, parent_id: Option<i64>, sort_order: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE folders SET parent_id = ?, sort_order = ?, updated_at = ? WHERE id = ?",
            rusqlite::params![parent_id, sort_order, Utc::now(), folder_id],
        )?;
        Ok(())
    }

    pub fn set_folder_sort_order(&self, folder_id: i64, sort_order: i64, updated_at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "UPDATE folders SET sort_order = ?, updated_at = ? WHERE id = ?",
            rusqlite::params![sort_order, updated_at, folder_id],
        )?;
        Ok(())
    }

    pub fn touch_folder(&self, folder_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE folders SET updated_at = ? WHERE id = ?",
            rusqlite::params![Utc::now(), folder_id],
        )?;
        Ok(())
    }

    /// The folder itself plus every folder below it.
    pub fn get_subtree_folder_ids(&self, folder_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            r#"
            WITH RECURSIVE subtree(id) AS (
                SELECT id FROM folders WHERE id = ?
                UNION
                SELECT f.id FROM folders f JOIN subtree s ON f.parent_id = s.id
            )
            SELECT id FROM subtree
            "#,
        )?;
        let ids = stmt
            .query_map([folder_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    /// Delete a folder; child folders and folder entries go with it through
    /// the cascading foreign keys. Returns the number of folders removed.
    pub fn delete_folder(&self, folder_id: i64) -> Result<usize> {
        let removed = self.get_subtree_folder_ids(folder_id)?.len();
        self.conn.execute("DELETE FROM folders WHERE id = ?", [folder_id])?;
        Ok(removed)
    }

    pub fn count_folders(&self) -> Result<i64> {
        let count = self.conn.query_row("SELECT COUNT(*) FROM folders", [], |row| row.get(0))?;
        Ok(count)
    }
}
