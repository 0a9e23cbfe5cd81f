//! SQL DDL for the frame store.
//!
//! Defines the `frames`, `frames_fts` (FTS5) and `schema_meta` tables. Later tables
//! are added by [`super::migrations`]. All DDL uses `IF NOT EXISTS` for idempotent
//! initialization.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Frame storage. List columns are JSON arrays.
CREATE TABLE IF NOT EXISTS frames (
    id TEXT PRIMARY KEY,
    timestamp TEXT NOT NULL,
    branch TEXT NOT NULL,
    jira TEXT,
    module_scope TEXT NOT NULL,
    summary_caption TEXT NOT NULL,
    reference_point TEXT NOT NULL,
    status_snapshot TEXT NOT NULL,
    keywords TEXT,
    atlas_frame_id TEXT,
    image_ids TEXT NOT NULL DEFAULT '[]'
);

CREATE INDEX IF NOT EXISTS idx_frames_timestamp ON frames(timestamp DESC, id DESC);
CREATE INDEX IF NOT EXISTS idx_frames_branch ON frames(branch);

-- Full-text search (BM25) over the searchable text of each frame
CREATE VIRTUAL TABLE IF NOT EXISTS frames_fts USING fts5(
    reference_point,
    summary_caption,
    keywords,
    id UNINDEXED
);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
