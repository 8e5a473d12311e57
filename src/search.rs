//! Free-text search over folder names and tag values.

use anyhow::Result;
use std::collections::HashSet;

use crate::db::{self, Database, Folder, SharedDb};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub folders: Vec<Folder>,
    /// Assets with at least one matching tag, each listed once, in the
    /// order their first matching tag was written.
    pub asset_identifiers: Vec<String>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.asset_identifiers.is_empty()
    }
}

impl Database {
    /// Case-insensitive substring match against folder names and tag values.
    /// An empty query matches nothing.
    pub fn search(&self, query: &str) -> Result<SearchResults> {
        let query = query.to_lowercase();
        if query.is_empty() {
            return Ok(SearchResults::default());
        }

        let folders = self
            .get_all_folders()?
            .into_iter()
            .filter(|f| f.name.to_lowercase().contains(&query))
            .collect();

        let mut seen = HashSet::new();
        let asset_identifiers = self
            .get_all_tags()?
            .into_iter()
            .filter(|t| t.value.to_lowercase().contains(&query))
            .map(|t| t.asset_identifier)
            .filter(|id| seen.insert(id.clone()))
            .collect();

        Ok(SearchResults { folders, asset_identifiers })
    }
}

pub fn search(db: &SharedDb, query: &str) -> Result<SearchResults> {
    db::lock(db)?.search(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_db, NewTag, TagType};

    fn seeded() -> Database {
        let db = test_db();
        db.insert_folder("Beach Trip", None, 0).unwrap();
        db.insert_folder("Family", None, 1).unwrap();
        db.insert_tags(&[
            NewTag::new("a1", TagType::Scene, "beach", 0.8),
            NewTag::new("a1", TagType::Object, "Beach Ball", 0.7),
            NewTag::new("a2", TagType::Scene, "sunset", 0.6),
            NewTag::new("a3", TagType::Text, "BEACHFRONT CAFE", 0.8),
        ])
        .unwrap();
        db
    }

    #[test]
    fn test_matches_folders_and_tags_case_insensitively() {
        let db = seeded();
        let results = db.search("BeAcH").unwrap();

        let folders: Vec<&str> = results.folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(folders, vec!["Beach Trip"]);
        assert_eq!(results.asset_identifiers, vec!["a1", "a3"]);
    }

    #[test]
    fn test_substring_match() {
        let db = seeded();
        let results = db.search("ami").unwrap();
        assert_eq!(results.folders.len(), 1);
        assert!(results.asset_identifiers.is_empty());

        let results = db.search("sun").unwrap();
        assert!(results.folders.is_empty());
        assert_eq!(results.asset_identifiers, vec!["a2"]);
    }

    #[test]
    fn test_empty_query_matches_nothing() {
        let db = seeded();
        assert!(db.search("").unwrap().is_empty());
        assert!(db.search("   ").unwrap().is_empty());
    }

    #[test]
    fn test_whitespace_is_part_of_the_query() {
        let db = seeded();
        assert!(db.search(" beach").unwrap().is_empty());
        assert_eq!(db.search(" trip").unwrap().folders.len(), 1);
        assert!(db.search("trip ").unwrap().is_empty());
    }

    #[test]
    fn test_no_match() {
        let db = seeded();
        assert!(db.search("mountain").unwrap().is_empty());
    }

    #[test]
    fn test_shared_handle() {
        let shared = seeded().into_shared();
        assert_eq!(search(&shared, "family").unwrap().folders.len(), 1);
    }
}
