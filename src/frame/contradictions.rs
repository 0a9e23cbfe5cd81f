//! Heuristic contradiction scan.
//!
//! Two frames contradict when they share a module and a reference-point keyword,
//! and exactly one of them phrases its reference point negatively.

use serde::Serialize;
use std::collections::BTreeSet;

use super::types::Frame;

const NEGATION_CUES: &[&str] = &[
    "not", "no", "never", "don't", "dont", "avoid", "without", "stop", "remove", "disable",
];

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "to", "of", "in", "on", "for", "with", "is", "are", "be",
    "use", "using", "we", "it", "this", "that",
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Contradiction {
    pub frame_a: String,
    pub frame_b: String,
    pub shared_modules: Vec<String>,
    pub keyword: String,
    /// Which of the two frames carries the negation.
    pub negated: String,
}

struct Profile<'a> {
    frame: &'a Frame,
    modules: BTreeSet<&'a str>,
    keywords: BTreeSet<String>,
    negated: bool,
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '-' || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn profile(frame: &Frame) -> Profile<'_> {
    let words: Vec<String> = tokens(&frame.reference_point).collect();
    let negated = words.iter().any(|w| NEGATION_CUES.contains(&w.as_str()));
    let keywords = words
        .into_iter()
        .filter(|w| w.len() > 2)
        .filter(|w| !NEGATION_CUES.contains(&w.as_str()) && !STOPWORDS.contains(&w.as_str()))
        .collect();
    Profile {
        frame,
        modules: frame.module_scope.iter().map(String::as_str).collect(),
        keywords,
        negated,
    }
}

/// Scan `frames` pairwise. When `module` is set only frames touching it are considered.
pub fn scan(frames: &[Frame], module: Option<&str>) -> Vec<Contradiction> {
    let profiles: Vec<Profile<'_>> = frames
        .iter()
        .filter(|f| module.map_or(true, |m| f.has_module(m)))
        .map(profile)
        .collect();

    let mut found = Vec::new();
    for (i, a) in profiles.iter().enumerate() {
        for b in &profiles[i + 1..] {
            if a.negated == b.negated {
                continue;
            }
            let shared_modules: Vec<String> = a
                .modules
                .intersection(&b.modules)
                .map(|m| m.to_string())
                .collect();
            if shared_modules.is_empty() {
                continue;
            }
            if let Some(keyword) = a.keywords.intersection(&b.keywords).next() {
                let negated = if a.negated { a.frame } else { b.frame };
                found.push(Contradiction {
                    frame_a: a.frame.id.clone(),
                    frame_b: b.frame.id.clone(),
                    shared_modules,
                    keyword: keyword.clone(),
                    negated: negated.id.clone(),
                });
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::types::StatusSnapshot;

    fn frame(id: &str, reference: &str, modules: &[&str]) -> Frame {
        Frame {
            id: id.into(),
            timestamp: "2026-01-01T00:00:00Z".into(),
            branch: "main".into(),
            jira: None,
            module_scope: modules.iter().map(|m| m.to_string()).collect(),
            summary_caption: "s".into(),
            reference_point: reference.into(),
            status_snapshot: StatusSnapshot::default(),
            keywords: None,
            atlas_frame_id: None,
            image_ids: vec![],
        }
    }

    #[test]
    fn detects_negated_pair_on_shared_module() {
        let frames = vec![
            frame("a", "Cache session tokens in redis", &["auth"]),
            frame("b", "Do not cache session tokens", &["auth", "ui"]),
        ];
        let found = scan(&frames, None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].shared_modules, ["auth"]);
        assert_eq!(found[0].negated, "b");
        assert!(["cache", "session", "tokens"].contains(&found[0].keyword.as_str()));
    }

    #[test]
    fn ignores_pairs_without_shared_module_or_keyword() {
        let frames = vec![
            frame("a", "Cache session tokens", &["auth"]),
            frame("b", "Never cache session tokens", &["billing"]),
            frame("c", "Avoid global state", &["auth"]),
        ];
        assert!(scan(&frames, None).is_empty());
    }

    #[test]
    fn module_filter_narrows_scan() {
        let frames = vec![
            frame("a", "Enable retries", &["net"]),
            frame("b", "Disable retries", &["net"]),
        ];
        assert_eq!(scan(&frames, Some("net")).len(), 1);
        assert!(scan(&frames, Some("auth")).is_empty());
    }
}
