//! Frame query engine: strategy selection for search, filtered vs. native listing.
//!
//! Search precedence: full-text on `reference_point`, then exact `jira`, then exact `branch`.
//! The store has no predicate pushdown for `jira`/`branch`/`module`/`since`, so those
//! filters run client-side over the newest `fetch_bound` frames. Frames older than
//! that window are invisible to filtered queries. Filtered listings cannot hand out
//! a valid cursor, so pagination is switched off for them.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::error::{ErrorCode, ToolError};

use super::store::{FrameStore, FtsQuery, ListOptions, ListOrder, PageInfo, StoreError};
use super::types::{Frame, MatchStrategy, SearchMode};

/// Default number of recent frames fetched before client-side filtering.
pub const DEFAULT_FETCH_BOUND: usize = 1000;

/// Default result limit for search and list.
pub const DEFAULT_LIMIT: usize = 10;

/// Transient search descriptor.
#[derive(Debug, Clone, Default)]
pub struct SearchCriteria {
    pub query: Option<String>,
    pub mode: SearchMode,
    pub jira: Option<String>,
    pub branch: Option<String>,
    pub limit: usize,
}

impl SearchCriteria {
    fn query_terms(&self) -> Vec<String> {
        self.query
            .as_deref()
            .map(|q| q.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn jira(&self) -> Option<&str> {
        non_blank(self.jira.as_deref())
    }

    fn branch(&self) -> Option<&str> {
        non_blank(self.branch.as_deref())
    }

    /// The strategy that will satisfy these criteria. First match wins.
    pub fn strategy(&self) -> MatchStrategy {
        if !self.query_terms().is_empty() {
            match self.mode {
                SearchMode::All => MatchStrategy::Fts,
                SearchMode::Any => MatchStrategy::FtsOr,
            }
        } else if self.jira().is_some() {
            MatchStrategy::FilterJira
        } else if self.branch().is_some() {
            MatchStrategy::FilterBranch
        } else {
            MatchStrategy::None
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Success,
    NoMatches,
}

/// Query parameters echoed back in search metadata.
#[derive(Debug, Clone, Serialize)]
pub struct QueryEcho {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_point: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jira: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub limit: usize,
    pub mode: SearchMode,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMetadata {
    pub query: QueryEcho,
    pub search_time_ms: u64,
    pub total_frames: u64,
    pub match_strategy: MatchStrategy,
    pub match_count: usize,
    pub status: SearchStatus,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub frames: Vec<Frame>,
    pub metadata: SearchMetadata,
}

/// The error returned when no search parameter was supplied.
pub fn missing_search_parameter() -> ToolError {
    ToolError::guidance(
        ErrorCode::ValidationMissingSearchParameter,
        "At least one search parameter is required: reference_point, jira, or branch",
        [
            "Provide reference_point to search frame text (e.g. \"auth refactor\")",
            "Provide jira to find frames for a ticket (e.g. \"PROJ-123\")",
            "Provide branch to find frames recorded on a branch (e.g. \"main\")",
        ],
    )
    .with_context(json!({
        "accepted": ["reference_point", "jira", "branch"],
        "hintId": "hint_missing_search_param",
    }))
}

/// Run a search against `store`.
pub fn search_frames(
    store: &dyn FrameStore,
    criteria: &SearchCriteria,
    fetch_bound: usize,
) -> Result<SearchOutcome, ToolError> {
    let strategy = criteria.strategy();
    if strategy == MatchStrategy::None {
        return Err(missing_search_parameter());
    }

    let started = Instant::now();
    let frames = match strategy {
        MatchStrategy::Fts | MatchStrategy::FtsOr => {
            let query = FtsQuery {
                terms: criteria.query_terms(),
                mode: criteria.mode,
                limit: criteria.limit,
            };
            match store.search_frames(&query) {
                Ok(frames) => frames,
                Err(StoreError::MalformedQuery(reason)) => {
                    tracing::debug!(%reason, "full-text query rejected, treating as no matches");
                    Vec::new()
                }
                Err(err) => return Err(ToolError::storage_read(err)),
            }
        }
        MatchStrategy::FilterJira => {
            let jira = criteria.jira().unwrap_or_default();
            filter_recent(store, fetch_bound, criteria.limit, |f| {
                f.jira.as_deref() == Some(jira)
            })?
        }
        MatchStrategy::FilterBranch => {
            let branch = criteria.branch().unwrap_or_default();
            filter_recent(store, fetch_bound, criteria.limit, |f| f.branch == branch)?
        }
        MatchStrategy::None => Vec::new(),
    };
    let search_time_ms = started.elapsed().as_millis() as u64;

    let total_frames = store.frame_count().map_err(ToolError::storage_read)?;
    let match_count = frames.len();

    tracing::debug!(
        strategy = %strategy,
        matches = match_count,
        elapsed_ms = search_time_ms,
        "frame search complete"
    );

    Ok(SearchOutcome {
        frames,
        metadata: SearchMetadata {
            query: QueryEcho {
                reference_point: criteria.query.clone(),
                jira: criteria.jira.clone(),
                branch: criteria.branch.clone(),
                limit: criteria.limit,
                mode: criteria.mode,
            },
            search_time_ms,
            total_frames,
            match_strategy: strategy,
            match_count,
            status: if match_count == 0 {
                SearchStatus::NoMatches
            } else {
                SearchStatus::Success
            },
        },
    })
}

/// Fetch the newest `fetch_bound` frames (one page, no cursor).
pub fn fetch_recent(store: &dyn FrameStore, fetch_bound: usize) -> Result<Vec<Frame>, ToolError> {
    let page = store
        .list_frames(&ListOptions {
            limit: fetch_bound,
            cursor: None,
        })
        .map_err(ToolError::storage_read)?;
    Ok(page.frames)
}

fn filter_recent<F>(
    store: &dyn FrameStore,
    fetch_bound: usize,
    limit: usize,
    keep: F,
) -> Result<Vec<Frame>, ToolError>
where
    F: Fn(&Frame) -> bool,
{
    Ok(fetch_recent(store, fetch_bound)?
        .into_iter()
        .filter(|f| keep(f))
        .take(limit)
        .collect())
}

/// Listing request.
#[derive(Debug, Clone, Default)]
pub struct ListCriteria {
    pub branch: Option<String>,
    pub module: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: usize,
    pub cursor: Option<String>,
}

impl ListCriteria {
    pub fn is_filtered(&self) -> bool {
        non_blank(self.branch.as_deref()).is_some()
            || non_blank(self.module.as_deref()).is_some()
            || self.since.is_some()
    }

    fn matches(&self, frame: &Frame) -> bool {
        if let Some(branch) = non_blank(self.branch.as_deref()) {
            if frame.branch != branch {
                return false;
            }
        }
        if let Some(module) = non_blank(self.module.as_deref()) {
            if !frame.has_module(module) {
                return false;
            }
        }
        if let Some(since) = self.since {
            match frame.created_at() {
                Some(created) if created >= since => {}
                _ => return false,
            }
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct ListOutcome {
    pub frames: Vec<Frame>,
    pub page: PageInfo,
    pub order: ListOrder,
    /// `true` when client-side filtering ran and pagination was disabled.
    pub filtered: bool,
}

/// List frames, delegating to store pagination unless a filter is set.
pub fn list_frames(
    store: &dyn FrameStore,
    criteria: &ListCriteria,
    fetch_bound: usize,
) -> Result<ListOutcome, ToolError> {
    if !criteria.is_filtered() {
        let page = store
            .list_frames(&ListOptions {
                limit: criteria.limit,
                cursor: criteria.cursor.clone(),
            })
            .map_err(ToolError::storage_read)?;
        return Ok(ListOutcome {
            frames: page.frames,
            page: page.page,
            order: page.order,
            filtered: false,
        });
    }

    if criteria.cursor.is_some() {
        tracing::debug!("cursor ignored for filtered listing");
    }

    let frames: Vec<Frame> = fetch_recent(store, fetch_bound)?
        .into_iter()
        .filter(|f| criteria.matches(f))
        .take(criteria.limit)
        .collect();

    Ok(ListOutcome {
        frames,
        page: PageInfo {
            limit: criteria.limit,
            next_cursor: None,
            has_more: false,
        },
        order: ListOrder::timestamp_desc(),
        filtered: true,
    })
}
