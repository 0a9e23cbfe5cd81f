//! SQLite-backed [`FrameStore`] and [`ImageStore`].
//!
//! One connection behind a mutex. Saving a frame upserts the row and rewrites its
//! FTS5 entry inside a transaction. Listing is newest first with an opaque
//! `"<timestamp>|<id>"` cursor.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::frame::store::{
    FramePage, FrameStore, FtsQuery, ImageStore, ListOptions, ListOrder, PageInfo, StoreError,
};
use crate::frame::types::{Frame, ImageAttachment, SearchMode};

const FRAME_COLUMNS: &str = "id, timestamp, branch, jira, module_scope, summary_caption, \
     reference_point, status_snapshot, keywords, atlas_frame_id, image_ids";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(super::open_database(path)?))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(super::open_memory_database()?))
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

/// Raw column values, before JSON decoding.
struct FrameRow {
    id: String,
    timestamp: String,
    branch: String,
    jira: Option<String>,
    module_scope: String,
    summary_caption: String,
    reference_point: String,
    status_snapshot: String,
    keywords: Option<String>,
    atlas_frame_id: Option<String>,
    image_ids: String,
}

impl FrameRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            branch: row.get(2)?,
            jira: row.get(3)?,
            module_scope: row.get(4)?,
            summary_caption: row.get(5)?,
            reference_point: row.get(6)?,
            status_snapshot: row.get(7)?,
            keywords: row.get(8)?,
            atlas_frame_id: row.get(9)?,
            image_ids: row.get(10)?,
        })
    }

    fn into_frame(self) -> Result<Frame, StoreError> {
        Ok(Frame {
            id: self.id,
            timestamp: self.timestamp,
            branch: self.branch,
            jira: self.jira,
            module_scope: serde_json::from_str(&self.module_scope)?,
            summary_caption: self.summary_caption,
            reference_point: self.reference_point,
            status_snapshot: serde_json::from_str(&self.status_snapshot)?,
            keywords: self
                .keywords
                .as_deref()
                .map(serde_json::from_str::<Vec<String>>)
                .transpose()?,
            atlas_frame_id: self.atlas_frame_id,
            image_ids: serde_json::from_str(&self.image_ids)?,
        })
    }
}

/// SQLite takes LIMIT as a signed integer; oversized limits clamp to its maximum.
fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn encode_cursor(frame: &Frame) -> String {
    format!("{}|{}", frame.timestamp, frame.id)
}

fn decode_cursor(cursor: &str) -> Result<(String, String), StoreError> {
    cursor
        .split_once('|')
        .filter(|(ts, id)| !ts.is_empty() && !id.is_empty())
        .map(|(ts, id)| (ts.to_string(), id.to_string()))
        .ok_or_else(|| StoreError::InvalidCursor(cursor.to_string()))
}

/// Build an FTS5 expression: each term quoted, joined with AND/OR.
fn fts_expression(query: &FtsQuery) -> String {
    let joiner = match query.mode {
        SearchMode::All => " AND ",
        SearchMode::Any => " OR ",
    };
    query
        .terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(joiner)
}

/// FTS5 reports expression problems as generic SQLite errors; tell them apart
/// from real failures by message.
fn classify_fts_error(err: rusqlite::Error) -> StoreError {
    let message = err.to_string();
    if message.contains("fts5") || message.contains("syntax error") || message.contains("unterminated")
    {
        StoreError::MalformedQuery(message)
    } else {
        StoreError::Database(err)
    }
}

fn query_frames(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Frame>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, FrameRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(FrameRow::into_frame).collect()
}

impl FrameStore for SqliteStore {
    fn save_frame(&self, frame: &Frame) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let module_scope = serde_json::to_string(&frame.module_scope)?;
        let status_snapshot = serde_json::to_string(&frame.status_snapshot)?;
        let keywords = frame.keywords.as_ref().map(serde_json::to_string).transpose()?;
        let image_ids = serde_json::to_string(&frame.image_ids)?;

        tx.execute(
            "INSERT INTO frames (id, timestamp, branch, jira, module_scope, summary_caption, \
             reference_point, status_snapshot, keywords, atlas_frame_id, image_ids) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
             ON CONFLICT(id) DO UPDATE SET \
             timestamp = excluded.timestamp, branch = excluded.branch, jira = excluded.jira, \
             module_scope = excluded.module_scope, summary_caption = excluded.summary_caption, \
             reference_point = excluded.reference_point, status_snapshot = excluded.status_snapshot, \
             keywords = excluded.keywords, atlas_frame_id = excluded.atlas_frame_id, \
             image_ids = excluded.image_ids",
            params![
                frame.id,
                frame.timestamp,
                frame.branch,
                frame.jira,
                module_scope,
                frame.summary_caption,
                frame.reference_point,
                status_snapshot,
                keywords,
                frame.atlas_frame_id,
                image_ids,
            ],
        )?;

        tx.execute("DELETE FROM frames_fts WHERE id = ?1", params![frame.id])?;
        tx.execute(
            "INSERT INTO frames_fts (reference_point, summary_caption, keywords, id) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                frame.reference_point,
                frame.summary_caption,
                frame.keywords.as_ref().map(|k| k.join(" ")).unwrap_or_default(),
                frame.id,
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn get_frame_by_id(&self, id: &str) -> Result<Option<Frame>, StoreError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {FRAME_COLUMNS} FROM frames WHERE id = ?1"),
                params![id],
                FrameRow::from_row,
            )
            .optional()?;
        row.map(FrameRow::into_frame).transpose()
    }

    fn delete_frame(&self, id: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM frames_fts WHERE id = ?1", params![id])?;
        let removed = tx.execute("DELETE FROM frames WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn list_frames(&self, options: &ListOptions) -> Result<FramePage, StoreError> {
        let conn = self.conn()?;
        // One extra row tells us whether another page exists.
        let fetch = sql_limit(options.limit).saturating_add(1);

        let mut frames = match options.cursor.as_deref() {
            Some(cursor) => {
                let (ts, id) = decode_cursor(cursor)?;
                query_frames(
                    &conn,
                    &format!(
                        "SELECT {FRAME_COLUMNS} FROM frames \
                         WHERE timestamp < ?1 OR (timestamp = ?1 AND id < ?2) \
                         ORDER BY timestamp DESC, id DESC LIMIT ?3"
                    ),
                    params![ts, id, fetch],
                )?
            }
            None => query_frames(
                &conn,
                &format!(
                    "SELECT {FRAME_COLUMNS} FROM frames ORDER BY timestamp DESC, id DESC LIMIT ?1"
                ),
                params![fetch],
            )?,
        };

        let has_more = frames.len() > options.limit;
        frames.truncate(options.limit);
        let next_cursor = if has_more {
            frames.last().map(encode_cursor)
        } else {
            None
        };

        Ok(FramePage {
            frames,
            page: PageInfo {
                limit: options.limit,
                next_cursor,
                has_more,
            },
            order: ListOrder::timestamp_desc(),
        })
    }

    fn search_frames(&self, query: &FtsQuery) -> Result<Vec<Frame>, StoreError> {
        let expression = fts_expression(query);
        if expression.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;
        let ids: Vec<String> = {
            let mut stmt = conn
                .prepare("SELECT id FROM frames_fts WHERE frames_fts MATCH ?1 ORDER BY rank LIMIT ?2")
                .map_err(classify_fts_error)?;
            let rows = stmt
                .query_map(params![expression, sql_limit(query.limit)], |row| row.get(0))
                .map_err(classify_fts_error)?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(classify_fts_error)?
        };

        let mut frames = Vec::with_capacity(ids.len());
        for id in ids {
            let row = conn
                .query_row(
                    &format!("SELECT {FRAME_COLUMNS} FROM frames WHERE id = ?1"),
                    params![id],
                    FrameRow::from_row,
                )
                .optional()?;
            if let Some(row) = row {
                frames.push(row.into_frame()?);
            }
        }
        Ok(frames)
    }

    fn frame_count(&self) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM frames", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn close(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute_batch("PRAGMA optimize")?;
        Ok(())
    }
}

impl ImageStore for SqliteStore {
    fn store_image(&self, frame_id: &str, image: &ImageAttachment) -> Result<String, StoreError> {
        let conn = self.conn()?;
        let id = uuid::Uuid::now_v7().to_string();
        conn.execute(
            "INSERT INTO frame_images (id, frame_id, mime_type, data, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                frame_id,
                image.mime_type,
                image.data,
                crate::frame::now_timestamp()
            ],
        )?;
        Ok(id)
    }

    fn delete_images_for_frame(&self, frame_id: &str) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        Ok(conn.execute(
            "DELETE FROM frame_images WHERE frame_id = ?1",
            params![frame_id],
        )?)
    }

    fn image_count(&self) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM frame_images", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
