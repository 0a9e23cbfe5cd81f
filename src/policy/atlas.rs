//! Atlas frames: the policy-graph neighbourhood around a set of seed modules.
//!
//! Edges come from `allowed_callers` / `forbidden_callers`. The walk is
//! breadth-first and ignores edge direction.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::Policy;

pub const MAX_FOLD_RADIUS: u8 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtlasModule {
    pub id: String,
    pub distance: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct AtlasEdge {
    pub from: String,
    pub to: String,
    pub allowed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AtlasFrame {
    pub seed_modules: Vec<String>,
    pub fold_radius: u8,
    pub modules: Vec<AtlasModule>,
    pub edges: Vec<AtlasEdge>,
}

fn policy_edges(policy: &Policy) -> Vec<AtlasEdge> {
    let mut edges = BTreeSet::new();
    for (id, rule) in &policy.modules {
        for caller in &rule.allowed_callers {
            if policy.is_canonical(caller) {
                edges.insert(AtlasEdge {
                    from: caller.clone(),
                    to: id.clone(),
                    allowed: true,
                });
            }
        }
        for caller in &rule.forbidden_callers {
            if policy.is_canonical(caller) {
                edges.insert(AtlasEdge {
                    from: caller.clone(),
                    to: id.clone(),
                    allowed: false,
                });
            }
        }
    }
    edges.into_iter().collect()
}

/// Compute the neighbourhood of `seeds` (canonical ids) within `fold_radius` hops.
pub fn compute_atlas(policy: &Policy, seeds: &[String], fold_radius: u8) -> AtlasFrame {
    let fold_radius = fold_radius.min(MAX_FOLD_RADIUS);
    let all_edges = policy_edges(policy);

    let mut adjacency: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for edge in &all_edges {
        adjacency.entry(edge.from.as_str()).or_default().insert(edge.to.as_str());
        adjacency.entry(edge.to.as_str()).or_default().insert(edge.from.as_str());
    }

    let mut distance: BTreeMap<&str, u8> = BTreeMap::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    for seed in seeds {
        if distance.insert(seed.as_str(), 0).is_none() {
            queue.push_back(seed.as_str());
        }
    }
    while let Some(current) = queue.pop_front() {
        let d = distance[current];
        if d >= fold_radius {
            continue;
        }
        for &next in adjacency.get(current).into_iter().flatten() {
            if !distance.contains_key(next) {
                distance.insert(next, d + 1);
                queue.push_back(next);
            }
        }
    }
    let reached: BTreeMap<String, u8> = distance
        .into_iter()
        .map(|(id, d)| (id.to_string(), d))
        .collect();

    let mut modules: Vec<AtlasModule> = reached
        .iter()
        .map(|(id, d)| AtlasModule {
            id: id.clone(),
            distance: *d,
            description: policy.modules.get(id).and_then(|r| r.description.clone()),
        })
        .collect();
    modules.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.id.cmp(&b.id)));

    let edges = all_edges
        .into_iter()
        .filter(|e| reached.contains_key(&e.from) && reached.contains_key(&e.to))
        .collect();

    AtlasFrame {
        seed_modules: seeds.to_vec(),
        fold_radius,
        modules,
        edges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn policy() -> Policy {
        Policy::from_json(
            r#"{
                "modules": {
                    "db": {"allowed_callers": ["api"]},
                    "api": {"allowed_callers": ["ui"], "forbidden_callers": ["worker"]},
                    "ui": {"description": "Frontend"},
                    "worker": {},
                    "island": {}
                }
            }"#,
            Path::new("atlas.json"),
        )
        .unwrap()
    }

    #[test]
    fn radius_zero_is_just_the_seeds() {
        let atlas = compute_atlas(&policy(), &["api".into()], 0);
        assert_eq!(atlas.modules.len(), 1);
        assert!(atlas.edges.is_empty());
    }

    #[test]
    fn radius_one_includes_callers_and_callees() {
        let atlas = compute_atlas(&policy(), &["api".into()], 1);
        let ids: Vec<&str> = atlas.modules.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["api", "db", "ui", "worker"]);
        assert!(atlas.edges.contains(&AtlasEdge {
            from: "worker".into(),
            to: "api".into(),
            allowed: false,
        }));
    }

    #[test]
    fn radius_two_walks_further() {
        let atlas = compute_atlas(&policy(), &["db".into()], 2);
        let ui = atlas.modules.iter().find(|m| m.id == "ui").unwrap();
        assert_eq!(ui.distance, 2);
        assert_eq!(ui.description.as_deref(), Some("Frontend"));
        assert!(!atlas.modules.iter().any(|m| m.id == "island"));
    }

    #[test]
    fn radius_is_capped() {
        let atlas = compute_atlas(&policy(), &["db".into()], 42);
        assert_eq!(atlas.fold_radius, MAX_FOLD_RADIUS);
    }
}
