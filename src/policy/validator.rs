//! Module id validation against a [`Policy`].

use serde::Serialize;

use super::Policy;

const MAX_SUGGESTIONS: usize = 3;
const MAX_EDIT_DISTANCE: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleIssue {
    pub module: String,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleValidation {
    pub valid: bool,
    /// Canonical ids in input order, duplicates collapsed. `None` when invalid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<Vec<String>>,
    /// `(alias, canonical)` pairs that were resolved.
    pub resolved_aliases: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ModuleIssue>,
}

/// Resolve aliases and report unknown ids with typo suggestions.
pub fn validate_module_ids(ids: &[String], policy: &Policy) -> ModuleValidation {
    let mut canonical: Vec<String> = Vec::with_capacity(ids.len());
    let mut resolved_aliases = Vec::new();
    let mut errors = Vec::new();

    for id in ids {
        match policy.resolve(id) {
            Some(target) => {
                if target != id {
                    resolved_aliases.push((id.clone(), target.to_string()));
                }
                if !canonical.iter().any(|c| c == target) {
                    canonical.push(target.to_string());
                }
            }
            None => errors.push(ModuleIssue {
                module: id.clone(),
                message: format!("Module '{id}' is not defined in the policy"),
                suggestions: suggest(id, policy),
            }),
        }
    }

    let valid = errors.is_empty();
    ModuleValidation {
        valid,
        canonical: valid.then_some(canonical),
        resolved_aliases,
        errors,
    }
}

/// Closest known ids (canonical or alias targets) by edit distance, then substring.
pub fn suggest(id: &str, policy: &Policy) -> Vec<String> {
    let needle = id.to_lowercase();
    let mut scored: Vec<(usize, &str)> = policy
        .module_ids()
        .chain(policy.aliases.keys().map(String::as_str))
        .filter_map(|candidate| {
            let lower = candidate.to_lowercase();
            let distance = strsim::levenshtein(&needle, &lower);
            if distance <= MAX_EDIT_DISTANCE {
                Some((distance, candidate))
            } else if lower.contains(&needle) || needle.contains(&lower) {
                Some((MAX_EDIT_DISTANCE + 1, candidate))
            } else {
                None
            }
        })
        .collect();
    scored.sort();

    let mut out: Vec<String> = Vec::new();
    for (_, candidate) in scored {
        let target = policy.resolve(candidate).unwrap_or(candidate);
        if !out.iter().any(|s| s == target) {
            out.push(target.to_string());
        }
        if out.len() == MAX_SUGGESTIONS {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn policy() -> Policy {
        Policy::from_json(
            r#"{
                "modules": {"services/auth": {}, "services/billing": {}, "ui/shell": {}},
                "aliases": {"auth": "services/auth"}
            }"#,
            Path::new("test.json"),
        )
        .unwrap()
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn canonical_ids_pass_through() {
        let result = validate_module_ids(&ids(&["services/auth", "ui/shell"]), &policy());
        assert!(result.valid);
        assert_eq!(result.canonical.unwrap(), ids(&["services/auth", "ui/shell"]));
        assert!(result.resolved_aliases.is_empty());
    }

    #[test]
    fn aliases_resolve_and_collapse() {
        let result = validate_module_ids(&ids(&["auth", "services/auth"]), &policy());
        assert!(result.valid);
        assert_eq!(result.canonical.unwrap(), ids(&["services/auth"]));
        assert_eq!(
            result.resolved_aliases,
            vec![("auth".to_string(), "services/auth".to_string())]
        );
    }

    #[test]
    fn typo_gets_suggestion() {
        let result = validate_module_ids(&ids(&["services/auht"]), &policy());
        assert!(!result.valid);
        assert!(result.canonical.is_none());
        assert_eq!(result.errors[0].module, "services/auht");
        assert_eq!(result.errors[0].suggestions[0], "services/auth");
    }

    #[test]
    fn substring_suggestions() {
        let suggestions = suggest("billing", &policy());
        assert_eq!(suggestions, ids(&["services/billing"]));
    }

    #[test]
    fn distant_ids_get_no_suggestion() {
        assert!(suggest("zzzzzzzzzz", &policy()).is_empty());
    }
}
