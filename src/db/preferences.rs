//! The singleton user preferences record.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};

use super::{Database, FolderSortOption};

/// What the app opens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HomeScreenMode {
    Photos,
    #[default]
    Folders,
}

impl HomeScreenMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HomeScreenMode::Photos => "photos",
            HomeScreenMode::Folders => "folders",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "photos" => Some(HomeScreenMode::Photos),
            "folders" => Some(HomeScreenMode::Folders),
            _ => None,
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            HomeScreenMode::Photos => "All Photos",
            HomeScreenMode::Folders => "Folders",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserPreferences {
    pub home_mode: HomeScreenMode,
    pub folder_sort: FolderSortOption,
    pub has_completed_onboarding: bool,
    pub tagging_enabled: bool,
    pub last_tagging_date: Option<DateTime<Utc>>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            home_mode: HomeScreenMode::default(),
            folder_sort: FolderSortOption::default(),
            has_completed_onboarding: false,
            tagging_enabled: true,
            last_tagging_date: None,
        }
    }
}

fn row_to_preferences(row: &rusqlite::Row) -> rusqlite::Result<UserPreferences> {
    let home: String = row.get(0)?;
    let sort: String = row.get(1)?;
    Ok(UserPreferences {
        home_mode: HomeScreenMode::from_str(&home).unwrap_or_default(),
        folder_sort: FolderSortOption::from_str(&sort).unwrap_or_default(),
        has_completed_onboarding: row.get::<_, i64>(2)? == 1,
        tagging_enabled: row.get::<_, i64>(3)? == 1,
        last_tagging_date: row.get(4)?,
    })
}

impl Database {
    /// Read the preferences, creating the default record on first use.
    pub fn get_preferences(&self) -> Result<UserPreferences> {
        let existing = self
            .conn
            .query_row(
                r#"
                SELECT home_screen_mode, default_folder_sort, has_completed_onboarding,
                       tagging_enabled, last_tagging_date
                FROM user_preferences WHERE id = 1
                "#,
                [],
                row_to_preferences,
            )
            .optional()?;

        match existing {
            Some(prefs) => Ok(prefs),
            None => {
                let prefs = UserPreferences::default();
                self.save_preferences(&prefs)?;
                tracing::debug!("Created default user preferences");
                Ok(prefs)
            }
        }
    }

    pub fn save_preferences(&self, prefs: &UserPreferences) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO user_preferences
                (id, home_screen_mode, default_folder_sort, has_completed_onboarding,
                 tagging_enabled, last_tagging_date)
            VALUES (1, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                home_screen_mode = excluded.home_screen_mode,
                default_folder_sort = excluded.default_folder_sort,
                has_completed_onboarding = excluded.has_completed_onboarding,
                tagging_enabled = excluded.tagging_enabled,
                last_tagging_date = excluded.last_tagging_date
            "#,
            rusqlite::params![
                prefs.home_mode.as_str(),
                prefs.folder_sort.as_str(),
                prefs.has_completed_onboarding as i64,
                prefs.tagging_enabled as i64,
                prefs.last_tagging_date,
            ],
        )?;
        Ok(())
    }

    /// Read-modify-write the preferences record.
    pub fn update_preferences<F>(&self, f: F) -> Result<UserPreferences>
    where
        F: FnOnce(&mut UserPreferences),
    {
        self.transaction(|db| {
            let mut prefs = db.get_preferences()?;
            f(&mut prefs);
            db.save_preferences(&prefs)?;
            Ok(prefs)
        })
    }

    pub fn set_home_mode(&self, mode: HomeScreenMode) -> Result<UserPreferences> {
        self.update_preferences(|p| p.home_mode = mode)
    }

    pub fn set_folder_sort(&self, sort: FolderSortOption) -> Result<UserPreferences> {
        self.update_preferences(|p| p.folder_sort = sort)
    }

    pub fn set_tagging_enabled(&self, enabled: bool) -> Result<UserPreferences> {
        self.update_preferences(|p| p.tagging_enabled = enabled)
    }

    pub fn complete_onboarding(&self) -> Result<UserPreferences> {
        self.update_preferences(|p| p.has_completed_onboarding = true)
    }

    pub fn set_last_tagging_date(&self, date: DateTime<Utc>) -> Result<UserPreferences> {
        self.update_preferences(|p| p.last_tagging_date = Some(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    #[test]
    fn test_defaults_created_lazily() {
        let db = test_db();
        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM user_preferences", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);

        let prefs = db.get_preferences().unwrap();
        assert_eq!(prefs, UserPreferences::default());
        db.get_preferences().unwrap();

        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM user_preferences", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_update_persists() {
        let db = test_db();
        db.update_preferences(|p| {
            p.home_mode = HomeScreenMode::Photos;
            p.folder_sort = FolderSortOption::Alphabetical;
            p.tagging_enabled = false;
            p.has_completed_onboarding = true;
        })
        .unwrap();

        let prefs = db.get_preferences().unwrap();
        assert_eq!(prefs.home_mode, HomeScreenMode::Photos);
        assert_eq!(prefs.folder_sort, FolderSortOption::Alphabetical);
        assert!(!prefs.tagging_enabled);
        assert!(prefs.has_completed_onboarding);
        assert!(prefs.last_tagging_date.is_none());
    }

    #[test]
    fn test_setters() {
        let db = test_db();
        db.set_home_mode(HomeScreenMode::Photos).unwrap();
        db.set_folder_sort(FolderSortOption::MostRecent).unwrap();
        db.complete_onboarding().unwrap();
        let when = Utc::now();
        let prefs = db.set_last_tagging_date(when).unwrap();

        assert_eq!(prefs.home_mode, HomeScreenMode::Photos);
        assert_eq!(prefs.folder_sort, FolderSortOption::MostRecent);
        assert!(prefs.has_completed_onboarding);
        assert_eq!(db.get_preferences().unwrap().last_tagging_date, Some(when));
    }

    #[test]
    fn test_singleton_row_enforced() {
        let db = test_db();
        db.get_preferences().unwrap();
        let second = db.conn.execute("INSERT INTO user_preferences (id) VALUES (2)", []);
        assert!(second.is_err());
    }
}
