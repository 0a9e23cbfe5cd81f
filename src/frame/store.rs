//! Storage collaborator contracts.
//!
//! The engine only talks to storage through [`FrameStore`] and [`ImageStore`]. Both
//! are synchronous; async callers run them on the blocking pool.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{Frame, ImageAttachment, SearchMode};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The full-text backend rejected the query expression.
    #[error("malformed full-text query: {0}")]
    MalformedQuery(String),
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("{0}")]
    Backend(String),
}

/// Store-native pagination request.
#[derive(Debug, Clone)]
pub struct ListOptions {
    pub limit: usize,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub limit: usize,
    #[serde(rename = "nextCursor")]
    pub next_cursor: Option<String>,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListOrder {
    pub by: String,
    pub direction: String,
}

impl ListOrder {
    /// Newest first.
    pub fn timestamp_desc() -> Self {
        Self {
            by: "timestamp".into(),
            direction: "desc".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FramePage {
    pub frames: Vec<Frame>,
    pub page: PageInfo,
    pub order: ListOrder,
}

/// A full-text request: whitespace-split terms combined per `mode`.
#[derive(Debug, Clone)]
pub struct FtsQuery {
    pub terms: Vec<String>,
    pub mode: SearchMode,
    pub limit: usize,
}

pub trait FrameStore: Send + Sync {
    /// Insert or replace a frame (and its full-text entry).
    fn save_frame(&self, frame: &Frame) -> Result<(), StoreError>;

    fn get_frame_by_id(&self, id: &str) -> Result<Option<Frame>, StoreError>;

    /// Returns `true` if a frame was removed.
    fn delete_frame(&self, id: &str) -> Result<bool, StoreError>;

    /// Newest-first page of frames.
    fn list_frames(&self, options: &ListOptions) -> Result<FramePage, StoreError>;

    /// Full-text search over reference point, summary caption and keywords.
    fn search_frames(&self, query: &FtsQuery) -> Result<Vec<Frame>, StoreError>;

    fn frame_count(&self) -> Result<u64, StoreError>;

    fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

pub trait ImageStore: Send + Sync {
    /// Persist one attachment for `frame_id`; returns the new image id.
    fn store_image(&self, frame_id: &str, image: &ImageAttachment) -> Result<String, StoreError>;

    /// Remove every image attached to `frame_id`.
    fn delete_images_for_frame(&self, frame_id: &str) -> Result<usize, StoreError>;

    fn image_count(&self) -> Result<u64, StoreError>;
}
