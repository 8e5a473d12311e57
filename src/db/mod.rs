mod schema;
pub mod assets;
pub mod folders;
pub mod preferences;
pub mod tags;

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub use schema::SCHEMA;
pub use assets::FolderAsset;
pub use folders::{Folder, FolderSortOption};
pub use preferences::{HomeScreenMode, UserPreferences};
pub use tags::{AssetTag, NewTag, TagStats, TagType};

/// Handle to the store shared by the index, search, and the tagging pipeline.
///
/// All writes go through the mutex, which gives the single-writer discipline
/// the store relies on.
pub type SharedDb = Arc<Mutex<Database>>;

/// Lock a shared store, turning a poisoned mutex into an ordinary error.
pub fn lock(db: &SharedDb) -> Result<MutexGuard<'_, Database>> {
    db.lock().map_err(|_| anyhow!("Database lock poisoned"))
}

pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        Ok(Self { conn })
    }

    /// Open a private in-memory store (used by tests and dry runs).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        Ok(Self { conn })
    }

    fn configure(conn: &Connection) -> Result<()> {
        // Cascade deletes of folders and their entries depend on this
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(())
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Run `f` inside a transaction. Changes are committed only if `f`
    /// returns `Ok`; any error rolls the whole batch back.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    pub fn into_shared(self) -> SharedDb {
        Arc::new(Mutex::new(self))
    }
}

#[cfg(test)]
pub(crate) fn test_db() -> Database {
    let db = Database::open_in_memory().unwrap();
    db.initialize().unwrap();
    db
}
