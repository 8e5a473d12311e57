//! Classification tags attached to library assets.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::Database;

/// Kind of a classification tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagType {
    Person,
    Object,
    Scene,
    Text,
    Location,
    Date,
    Color,
}

impl TagType {
    pub const ALL: [TagType; 7] = [
        TagType::Person,
        TagType::Object,
        TagType::Scene,
        TagType::Text,
        TagType::Location,
        TagType::Date,
        TagType::Color,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TagType::Person => "person",
            TagType::Object => "object",
            TagType::Scene => "scene",
            TagType::Text => "text",
            TagType::Location => "location",
            TagType::Date => "date",
            TagType::Color => "color",
        }
    }

    /// Unknown values read back as `Object`.
    pub fn from_str(s: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .unwrap_or(TagType::Object)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TagType::Person => "People",
            TagType::Object => "Objects",
            TagType::Scene => "Scenes",
            TagType::Text => "Text",
            TagType::Location => "Places",
            TagType::Date => "Dates",
            TagType::Color => "Colors",
        }
    }
}

/// A persisted tag.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetTag {
    pub id: i64,
    pub asset_identifier: String,
    pub tag_type: TagType,
    pub value: String,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

/// A tag produced by a detector, not yet written to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTag {
    pub asset_identifier: String,
    pub tag_type: TagType,
    pub value: String,
    pub confidence: f64,
}

impl NewTag {
    pub fn new(asset_identifier: &str, tag_type: TagType, value: impl Into<String>, confidence: f64) -> Self {
        Self {
            asset_identifier: asset_identifier.to_string(),
            tag_type,
            value: value.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Counts shown on the settings screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TagStats {
    pub tagged_assets: i64,
    pub total_tags: i64,
}

fn row_to_tag(row: &rusqlite::Row) -> rusqlite::Result<AssetTag> {
    Ok(AssetTag {
        id: row.get(0)?,
        asset_identifier: row.get(1)?,
        tag_type: TagType::from_str(&row.get::<_, String>(2)?),
        value: row.get(3)?,
        confidence: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl Database {
    /// Write a batch of tags in one transaction.
    pub fn insert_tags(&self, tags: &[NewTag]) -> Result<usize> {
        if tags.is_empty() {
            return Ok(0);
        }
        self.transaction(|db| db.write_tags(tags))
    }

    /// Drop an asset's existing tags and write `tags` in their place, atomically.
    pub fn replace_tags_for_asset(&self, asset_identifier: &str, tags: &[NewTag]) -> Result<usize> {
        self.transaction(|db| {
            db.delete_tags_for_asset(asset_identifier)?;
            db.write_tags(tags)
        })
    }

    fn write_tags(&self, tags: &[NewTag]) -> Result<usize> {
        let now = Utc::now();
        let mut stmt = self.conn.prepare(
            r#"
            INSERT INTO asset_tags (asset_identifier, tag_type, value, confidence, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )?;
        for tag in tags {
            stmt.execute(rusqlite::params![
                tag.asset_identifier,
                tag.tag_type.as_str(),
                tag.value,
                tag.confidence,
                now
            ])?;
        }
        Ok(tags.len())
    }

    /// Every asset identifier that carries at least one tag.
    pub fn get_tagged_identifiers(&self) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT DISTINCT asset_identifier FROM asset_tags")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<HashSet<String>>>()?;
        Ok(ids)
    }

    pub fn get_tags_for_asset(&self, asset_identifier: &str) -> Result<Vec<AssetTag>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, asset_identifier, tag_type, value, confidence, created_at
            FROM asset_tags
            WHERE asset_identifier = ?
            ORDER BY confidence DESC, id
            "#,
        )?;
        let tags = stmt
            .query_map([asset_identifier], row_to_tag)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    pub fn get_all_tags(&self) -> Result<Vec<AssetTag>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, asset_identifier, tag_type, value, confidence, created_at FROM asset_tags ORDER BY id",
        )?;
        let tags = stmt
            .query_map([], row_to_tag)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    pub fn delete_tags_for_asset(&self, asset_identifier: &str) -> Result<usize> {
        let deleted = self
            .conn
            .execute("DELETE FROM asset_tags WHERE asset_identifier = ?", [asset_identifier])?;
        Ok(deleted)
    }

    pub fn tag_stats(&self) -> Result<TagStats> {
        let stats = self.conn.query_row(
            "SELECT COUNT(DISTINCT asset_identifier), COUNT(*) FROM asset_tags",
            [],
            |row| {
                Ok(TagStats {
                    tagged_assets: row.get(0)?,
                    total_tags: row.get(1)?,
                })
            },
        )?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    #[test]
    fn test_insert_and_read_back() {
        let db = test_db();
        let written = db
            .insert_tags(&[
                NewTag::new("a1", TagType::Object, "dog", 0.9),
                NewTag::new("a1", TagType::Scene, "park", 0.4),
                NewTag::new("a2", TagType::Object, "dog", 0.8),
            ])
            .unwrap();
        assert_eq!(written, 3);

        let tags = db.get_tags_for_asset("a1").unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].value, "dog");
        assert_eq!(tags[1].tag_type, TagType::Scene);

        let tagged = db.get_tagged_identifiers().unwrap();
        assert!(tagged.contains("a1") && tagged.contains("a2"));

        assert_eq!(db.tag_stats().unwrap(), TagStats { tagged_assets: 2, total_tags: 3 });
    }

    #[test]
    fn test_unreadable_row_is_an_error() {
        let db = test_db();
        db.insert_tags(&[NewTag::new("a1", TagType::Object, "dog", 0.9)]).unwrap();
        db.conn
            .execute(
                "INSERT INTO asset_tags (asset_identifier, tag_type, value, confidence, created_at)
                 VALUES ('a1', 'object', 'cat', 0.8, 'not a timestamp')",
                [],
            )
            .unwrap();

        assert!(db.get_tags_for_asset("a1").is_err());
        assert!(db.get_all_tags().is_err());
    }

    #[test]
    fn test_duplicate_values_are_allowed() {
        let db = test_db();
        db.insert_tags(&[
            NewTag::new("a1", TagType::Object, "document", 0.7),
            NewTag::new("a1", TagType::Object, "document", 0.9),
        ])
        .unwrap();
        assert_eq!(db.get_tags_for_asset("a1").unwrap().len(), 2);
    }

    #[test]
    fn test_delete_tags_for_asset() {
        let db = test_db();
        db.insert_tags(&[NewTag::new("a1", TagType::Text, "menu", 0.8)]).unwrap();
        assert_eq!(db.delete_tags_for_asset("a1").unwrap(), 1);
        assert!(db.get_tagged_identifiers().unwrap().is_empty());
    }

    #[test]
    fn test_replace_tags_for_asset() {
        let db = test_db();
        db.insert_tags(&[
            NewTag::new("a1", TagType::Object, "cat", 0.9),
            NewTag::new("a2", TagType::Object, "cat", 0.9),
        ])
        .unwrap();
        db.replace_tags_for_asset("a1", &[NewTag::new("a1", TagType::Object, "lynx", 0.6)])
            .unwrap();

        let values: Vec<String> = db.get_tags_for_asset("a1").unwrap().into_iter().map(|t| t.value).collect();
        assert_eq!(values, vec!["lynx"]);
        assert_eq!(db.get_tags_for_asset("a2").unwrap().len(), 1);
    }

    #[test]
    fn test_tag_type_round_trip_and_fallback() {
        for t in TagType::ALL {
            assert_eq!(TagType::from_str(t.as_str()), t);
        }
        assert_eq!(TagType::from_str("mystery"), TagType::Object);
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(NewTag::new("a", TagType::Object, "x", 1.7).confidence, 1.0);
        assert_eq!(NewTag::new("a", TagType::Object, "x", -0.2).confidence, 0.0);
    }
}
