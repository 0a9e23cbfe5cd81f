use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::types::Frame;

/// Response from `db_stats`.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_frames: u64,
    pub total_images: u64,
    pub by_branch: BTreeMap<String, u64>,
    pub top_modules: Vec<ModuleCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_frame: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_frame: Option<String>,
    /// `true` when the breakdowns cover only the most recent fetch window.
    pub sampled: bool,
    pub sample_size: usize,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ModuleCount {
    pub module: String,
    pub frames: u64,
}

/// Compute statistics over a newest-first `sample` of frames.
pub fn frame_stats(
    sample: &[Frame],
    total_frames: u64,
    total_images: u64,
    top_n: usize,
) -> StatsResponse {
    let mut by_branch: BTreeMap<String, u64> = BTreeMap::new();
    let mut by_module: HashMap<&str, u64> = HashMap::new();

    for frame in sample {
        *by_branch.entry(frame.branch.clone()).or_default() += 1;
        for module in &frame.module_scope {
            *by_module.entry(module.as_str()).or_default() += 1;
        }
    }

    let mut top_modules: Vec<ModuleCount> = by_module
        .into_iter()
        .map(|(module, frames)| ModuleCount {
            module: module.to_string(),
            frames,
        })
        .collect();
    top_modules.sort_by(|a, b| b.frames.cmp(&a.frames).then_with(|| a.module.cmp(&b.module)));
    top_modules.truncate(top_n);

    let newest_frame = sample.iter().map(|f| f.timestamp.as_str()).max().map(str::to_string);
    let oldest_frame = sample.iter().map(|f| f.timestamp.as_str()).min().map(str::to_string);

    StatsResponse {
        total_frames,
        total_images,
        by_branch,
        top_modules,
        oldest_frame,
        newest_frame,
        sampled: total_frames > sample.len() as u64,
        sample_size: sample.len(),
    }
}
