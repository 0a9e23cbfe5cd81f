//! Turn cost: a weighted coordination-overhead score over a window of frames.

use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::types::Frame;

/// Accepted reporting windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Week,
    Month,
}

impl Period {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "24h" => Some(Self::Day),
            "7d" => Some(Self::Week),
            "30d" => Some(Self::Month),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "24h",
            Self::Week => "7d",
            Self::Month => "30d",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Self::Day => Duration::hours(24),
            Self::Week => Duration::days(7),
            Self::Month => Duration::days(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TurnCostWeights {
    pub frames: f64,
    pub blockers: f64,
    pub merge_blockers: f64,
    pub failing_tests: f64,
    pub context_switches: f64,
}

impl Default for TurnCostWeights {
    fn default() -> Self {
        Self {
            frames: 1.0,
            blockers: 3.0,
            merge_blockers: 5.0,
            failing_tests: 2.0,
            context_switches: 2.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TurnCostComponents {
    pub frames: u64,
    pub blockers: u64,
    pub merge_blockers: u64,
    pub failing_tests: u64,
    /// Consecutive frames whose module scopes share nothing.
    pub context_switches: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnCost {
    pub period: String,
    pub window_start: String,
    pub components: TurnCostComponents,
    pub weights: TurnCostWeights,
    pub total: f64,
}

/// Score the frames created within `period` before `now`.
pub fn calculate(
    frames: &[Frame],
    period: Period,
    weights: TurnCostWeights,
    now: DateTime<Utc>,
) -> TurnCost {
    let window_start = now - period.duration();

    let mut in_window: Vec<&Frame> = frames
        .iter()
        .filter(|f| f.created_at().is_some_and(|t| t >= window_start && t <= now))
        .collect();
    in_window.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    let mut components = TurnCostComponents {
        frames: in_window.len() as u64,
        ..Default::default()
    };
    for frame in &in_window {
        let status = &frame.status_snapshot;
        components.blockers += status.blockers.as_ref().map_or(0, |v| v.len() as u64);
        components.merge_blockers += status.merge_blockers.as_ref().map_or(0, |v| v.len() as u64);
        components.failing_tests += status.tests_failing.as_ref().map_or(0, |v| v.len() as u64);
    }
    components.context_switches = in_window
        .windows(2)
        .filter(|pair| {
            let prev: HashSet<&String> = pair[0].module_scope.iter().collect();
            !pair[1].module_scope.iter().any(|m| prev.contains(m))
        })
        .count() as u64;

    let total = weights.frames * components.frames as f64
        + weights.blockers * components.blockers as f64
        + weights.merge_blockers * components.merge_blockers as f64
        + weights.failing_tests * components.failing_tests as f64
        + weights.context_switches * components.context_switches as f64;

    TurnCost {
        period: period.as_str().to_string(),
        window_start: window_start.to_rfc3339(),
        components,
        weights,
        total,
    }
}
