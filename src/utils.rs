//! Utility functions for the team formation engine

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Generate a new unique team ID
pub fn generate_team_id() -> Uuid {
    Uuid::new_v4()
}

/// Generate a new unique match request ID
pub fn generate_request_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Normalize a skill tag for exact matching (trim + lowercase).
///
/// Exact normalized matching deliberately replaces substring matching, so
/// "Java" never matches inside "JavaScript".
pub fn normalize_skill(skill: &str) -> String {
    skill.trim().to_lowercase()
}

/// Normalize a list of skill tags into a deduplicated, ordered set.
/// Empty tags are dropped.
pub fn normalized_skill_set(skills: &[String]) -> BTreeSet<String> {
    skills
        .iter()
        .map(|s| normalize_skill(s))
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique_ids() {
        let id1 = generate_team_id();
        let id2 = generate_team_id();
        assert_ne!(id1, id2);

        let req1 = generate_request_id();
        let req2 = generate_request_id();
        assert_ne!(req1, req2);
    }

    #[test]
    fn test_normalize_skill() {
        assert_eq!(normalize_skill("  React "), "react");
        assert_eq!(normalize_skill("Node.js"), "node.js");
    }

    #[test]
    fn test_normalized_skill_set_dedupes() {
        let skills = vec![
            "React".to_string(),
            "react".to_string(),
            "  REACT ".to_string(),
            "".to_string(),
            "Python".to_string(),
        ];
        let set = normalized_skill_set(&skills);
        assert_eq!(set.len(), 2);
        assert!(set.contains("react"));
        assert!(set.contains("python"));
    }

    #[test]
    fn test_exact_matching_keeps_java_out_of_javascript() {
        let a = normalized_skill_set(&["Java".to_string()]);
        let b = normalized_skill_set(&["JavaScript".to_string()]);
        assert!(a.intersection(&b).next().is_none());
    }
}
