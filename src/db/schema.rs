pub const SCHEMA: &str = r#"
-- Folders: user-defined hierarchy, independent of system albums
CREATE TABLE IF NOT EXISTS folders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    parent_id INTEGER,                 -- NULL for top-level folders
    sort_order INTEGER NOT NULL DEFAULT 0,
    is_favorite INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (parent_id) REFERENCES folders(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_folders_parent ON folders(parent_id);

-- Folder membership: references to library assets, ordered per folder.
-- Uniqueness of (folder_id, asset_identifier) is maintained by the index.
CREATE TABLE IF NOT EXISTS folder_assets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    folder_id INTEGER NOT NULL,
    asset_identifier TEXT NOT NULL,
    sort_order INTEGER NOT NULL DEFAULT 0,
    added_at TEXT NOT NULL,
    FOREIGN KEY (folder_id) REFERENCES folders(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_folder_assets_folder ON folder_assets(folder_id);
CREATE INDEX IF NOT EXISTS idx_folder_assets_identifier ON folder_assets(asset_identifier);

-- Classification tags produced by the tagging pipeline
CREATE TABLE IF NOT EXISTS asset_tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    asset_identifier TEXT NOT NULL,
    tag_type TEXT NOT NULL,            -- person/object/scene/text/location/date/color
    value TEXT NOT NULL,
    confidence REAL NOT NULL DEFAULT 1.0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_asset_tags_identifier ON asset_tags(asset_identifier);

-- Singleton preferences row
CREATE TABLE IF NOT EXISTS user_preferences (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    home_screen_mode TEXT NOT NULL DEFAULT 'folders',
    default_folder_sort TEXT NOT NULL DEFAULT 'custom',
    has_completed_onboarding INTEGER NOT NULL DEFAULT 0,
    tagging_enabled INTEGER NOT NULL DEFAULT 1,
    last_tagging_date TEXT
);
"#;
