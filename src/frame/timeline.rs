//! Chronological view of the frames recorded for one ticket or branch.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

use super::types::Frame;

#[derive(Debug, Serialize)]
pub struct TimelineEntry {
    pub frame_id: String,
    pub timestamp: String,
    pub branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jira: Option<String>,
    pub summary_caption: String,
    pub next_action: String,
    pub module_scope: Vec<String>,
    /// Modules present here but not in the previous entry.
    pub modules_added: Vec<String>,
    /// Modules present in the previous entry but not here.
    pub modules_removed: Vec<String>,
    pub blocker_count: usize,
}

#[derive(Debug, Serialize)]
pub struct Timeline {
    pub key: String,
    pub entries: Vec<TimelineEntry>,
}

/// Build a timeline for `key` (matched against `jira` or `branch`) from a
/// newest-first batch. Entries come out oldest first.
pub fn build_timeline(
    frames: Vec<Frame>,
    key: &str,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
    limit: usize,
) -> Timeline {
    let mut selected: Vec<Frame> = frames
        .into_iter()
        .filter(|f| f.jira.as_deref() == Some(key) || f.branch == key)
        .filter(|f| match f.created_at() {
            Some(t) => since.map_or(true, |s| t >= s) && until.map_or(true, |u| t <= u),
            None => since.is_none() && until.is_none(),
        })
        .collect();

    selected.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.id.cmp(&b.id))
    });
    // Keep the most recent `limit` entries.
    if selected.len() > limit {
        selected.drain(..selected.len() - limit);
    }

    let mut previous: BTreeSet<String> = BTreeSet::new();
    let mut entries = Vec::with_capacity(selected.len());
    for (i, frame) in selected.into_iter().enumerate() {
        let current: BTreeSet<String> = frame.module_scope.iter().cloned().collect();
        let (modules_added, modules_removed) = if i == 0 {
            (Vec::new(), Vec::new())
        } else {
            (
                current.difference(&previous).cloned().collect(),
                previous.difference(&current).cloned().collect(),
            )
        };
        entries.push(TimelineEntry {
            frame_id: frame.id,
            timestamp: frame.timestamp,
            branch: frame.branch,
            jira: frame.jira,
            summary_caption: frame.summary_caption,
            next_action: frame.status_snapshot.next_action,
            module_scope: frame.module_scope,
            modules_added,
            modules_removed,
            blocker_count: frame.status_snapshot.blockers.map_or(0, |b| b.len()),
        });
        previous = current;
    }

    Timeline {
        key: key.to_string(),
        entries,
    }
}
