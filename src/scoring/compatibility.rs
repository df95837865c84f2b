//! Pairwise compatibility scoring
//!
//! Scores two profiles on a 0-100 scale from three weighted terms: skill
//! overlap, experience-tier proximity, and personality-trait affinity.
//! Terms that cannot be evaluated (missing tier or trait vector on either
//! side) are excluded from both numerator and denominator, so scores stay
//! comparable across profiles with partial data.

use crate::types::{CompatibilityScore, Event, Profile, SubScore};
use crate::utils::normalized_skill_set;

/// Weights for the scoring terms. The defaults sum to 100.
#[derive(Debug, Clone)]
pub struct ScoringWeights {
    /// Weight of the skill-overlap term
    pub skills: f64,
    /// Weight of the experience-tier term
    pub tier: f64,
    /// Weight of the trait-affinity term
    pub traits: f64,
    /// Credit for differing (but both present) tiers, as a fraction of
    /// the tier weight. Identical tiers always earn the full weight.
    pub tier_partial_credit: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            skills: 40.0,
            tier: 20.0,
            traits: 40.0,
            tier_partial_credit: 0.7,
        }
    }
}

/// Deterministic pairwise scorer. No I/O, never errors.
#[derive(Debug, Clone, Default)]
pub struct CompatibilityScorer {
    weights: ScoringWeights,
}

impl CompatibilityScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Score two profiles, optionally in the context of an event.
    ///
    /// Symmetric in its arguments: `score(a, b) == score(b, a)`.
    pub fn score(&self, a: &Profile, b: &Profile, event: Option<&Event>) -> CompatibilityScore {
        let (skills, shared_skills) = self.skill_overlap(a, b);
        let tier = self.tier_proximity(a, b);
        let traits = self.trait_affinity(a, b);

        let applicable_max =
            skills.max + tier.map_or(0.0, |s| s.max) + traits.map_or(0.0, |s| s.max);
        let achieved =
            skills.points + tier.map_or(0.0, |s| s.points) + traits.map_or(0.0, |s| s.points);

        // The skill term is always applicable, so applicable_max > 0.
        let total = (achieved / applicable_max) * 100.0;

        CompatibilityScore {
            total: total.clamp(0.0, 100.0),
            skills,
            tier,
            traits,
            shared_skills,
            event_id: event.map(|e| e.event_id.clone()),
        }
    }

    /// Jaccard overlap of normalized skill sets, scaled to the skill weight.
    /// The union size floors at 1, so two empty sets score zero rather
    /// than dividing by zero.
    fn skill_overlap(&self, a: &Profile, b: &Profile) -> (SubScore, Vec<String>) {
        let set_a = normalized_skill_set(&a.skills);
        let set_b = normalized_skill_set(&b.skills);

        let shared: Vec<String> = set_a.intersection(&set_b).cloned().collect();
        let union = set_a.union(&set_b).count();

        let ratio = shared.len() as f64 / union.max(1) as f64;

        (
            SubScore {
                points: ratio * self.weights.skills,
                max: self.weights.skills,
            },
            shared,
        )
    }

    /// Identical tiers earn the full weight, differing tiers the partial
    /// credit. Not a distance metric: Lead vs Student scores the same as
    /// Mid vs Senior. A missing tier on either side excludes the term.
    fn tier_proximity(&self, a: &Profile, b: &Profile) -> Option<SubScore> {
        let (tier_a, tier_b) = (a.tier?, b.tier?);
        let factor = if tier_a == tier_b {
            1.0
        } else {
            self.weights.tier_partial_credit
        };
        Some(SubScore {
            points: factor * self.weights.tier,
            max: self.weights.tier,
        })
    }

    /// Per-trait closeness `1 - |a - b|`, averaged over the five traits.
    /// Excluded entirely when either side carries no vector.
    fn trait_affinity(&self, a: &Profile, b: &Profile) -> Option<SubScore> {
        let (va, vb) = (a.traits?, b.traits?);

        let closeness: f64 = va
            .as_array()
            .iter()
            .zip(vb.as_array().iter())
            .map(|(x, y)| 1.0 - (x - y).abs())
            .sum::<f64>()
            / 5.0;

        Some(SubScore {
            points: closeness * self.weights.traits,
            max: self.weights.traits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExperienceTier, MatchingPreferences, TraitVector};
    use proptest::prelude::*;

    fn profile(
        id: &str,
        skills: &[&str],
        tier: Option<ExperienceTier>,
        traits: Option<TraitVector>,
    ) -> Profile {
        Profile {
            user_id: id.to_string(),
            display_name: id.to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            tier,
            traits,
            preferences: MatchingPreferences::default(),
        }
    }

    #[test]
    fn test_identical_profiles_score_100() {
        let scorer = CompatibilityScorer::new();
        let a = profile(
            "a",
            &["React", "Node"],
            Some(ExperienceTier::Mid),
            Some(TraitVector::uniform(0.5)),
        );

        let score = scorer.score(&a, &a, None);
        assert!((score.total - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_worked_example() {
        // A{React,Node} vs B{React,Python}, both Mid, traits all 0.5:
        // skill ratio 1/3 -> ~13.3, tier match -> 20, traits -> 40,
        // total ~73.3.
        let scorer = CompatibilityScorer::new();
        let a = profile(
            "a",
            &["React", "Node"],
            Some(ExperienceTier::Mid),
            Some(TraitVector::uniform(0.5)),
        );
        let b = profile(
            "b",
            &["React", "Python"],
            Some(ExperienceTier::Mid),
            Some(TraitVector::uniform(0.5)),
        );

        let score = scorer.score(&a, &b, None);
        assert!((score.total - 73.333).abs() < 0.05, "got {}", score.total);
        assert!((score.skills.points - 40.0 / 3.0).abs() < 0.01);
        assert_eq!(score.tier.unwrap().points, 20.0);
        assert_eq!(score.traits.unwrap().points, 40.0);
        assert_eq!(score.shared_skills, vec!["react".to_string()]);
    }

    #[test]
    fn test_symmetry() {
        let scorer = CompatibilityScorer::new();
        let a = profile(
            "a",
            &["Rust", "SQL"],
            Some(ExperienceTier::Senior),
            Some(TraitVector::uniform(0.8)),
        );
        let b = profile(
            "b",
            &["Rust", "Go", "Docker"],
            Some(ExperienceTier::Junior),
            Some(TraitVector::uniform(0.3)),
        );

        let ab = scorer.score(&a, &b, None);
        let ba = scorer.score(&b, &a, None);
        assert!((ab.total - ba.total).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_tier_excludes_term() {
        let scorer = CompatibilityScorer::new();
        let a = profile(
            "a",
            &["React"],
            None,
            Some(TraitVector::uniform(0.5)),
        );
        let b = profile(
            "b",
            &["React"],
            Some(ExperienceTier::Mid),
            Some(TraitVector::uniform(0.5)),
        );

        let score = scorer.score(&a, &b, None);
        assert!(score.tier.is_none());
        assert_eq!(score.applicable_max(), 80.0);
        // Full skill overlap + zero trait diff over an 80-point base.
        assert!((score.total - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_traits_excludes_term_instead_of_zero_fill() {
        let scorer = CompatibilityScorer::new();
        let a = profile("a", &["React"], Some(ExperienceTier::Mid), None);
        let b = profile(
            "b",
            &["React"],
            Some(ExperienceTier::Mid),
            Some(TraitVector::uniform(0.9)),
        );

        let score = scorer.score(&a, &b, None);
        assert!(score.traits.is_none());
        assert_eq!(score.applicable_max(), 60.0);
        // (40 + 20) / 60 = 100, not (40 + 20 + 0) / 100 = 60.
        assert!((score.total - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_both_skill_sets_empty() {
        let scorer = CompatibilityScorer::new();
        let a = profile("a", &[], Some(ExperienceTier::Mid), None);
        let b = profile("b", &[], Some(ExperienceTier::Mid), None);

        let score = scorer.score(&a, &b, None);
        assert_eq!(score.skills.points, 0.0);
        // Skill term stays applicable even when empty.
        assert_eq!(score.applicable_max(), 60.0);
        assert!((score.total - (20.0 / 60.0) * 100.0).abs() < 0.01);
    }

    #[test]
    fn test_differing_tier_partial_credit() {
        let scorer = CompatibilityScorer::new();
        let a = profile("a", &["Rust"], Some(ExperienceTier::Student), None);
        let b = profile("b", &["Rust"], Some(ExperienceTier::Lead), None);

        let score = scorer.score(&a, &b, None);
        assert!((score.tier.unwrap().points - 14.0).abs() < f64::EPSILON);

        // Partial credit is flat, not distance-based.
        let c = profile("c", &["Rust"], Some(ExperienceTier::Senior), None);
        let score_near = scorer.score(&b, &c, None);
        assert_eq!(score.tier.unwrap().points, score_near.tier.unwrap().points);
    }

    #[test]
    fn test_breakdown_sums_to_total() {
        let scorer = CompatibilityScorer::new();
        let a = profile(
            "a",
            &["React", "Node", "SQL"],
            Some(ExperienceTier::Junior),
            Some(TraitVector::uniform(0.2)),
        );
        let b = profile(
            "b",
            &["React", "Go"],
            Some(ExperienceTier::Mid),
            Some(TraitVector::uniform(0.7)),
        );

        let score = scorer.score(&a, &b, None);
        let recomputed = (score.achieved_points() / score.applicable_max()) * 100.0;
        assert!((score.total - recomputed).abs() < 1e-9);
    }

    #[test]
    fn test_event_context_recorded() {
        let scorer = CompatibilityScorer::new();
        let a = profile("a", &["React"], None, None);
        let b = profile("b", &["React"], None, None);
        let event = Event {
            event_id: "hack-2026".to_string(),
            title: "Hack 2026".to_string(),
            min_team_size: 2,
            max_team_size: 5,
            registration_closes_at: None,
            formation_closes_at: None,
        };

        let score = scorer.score(&a, &b, Some(&event));
        assert_eq!(score.event_id.as_deref(), Some("hack-2026"));
    }

    proptest! {
        #[test]
        fn prop_score_in_range(
            skills_a in proptest::collection::vec("[a-z]{1,8}", 0..6),
            skills_b in proptest::collection::vec("[a-z]{1,8}", 0..6),
            trait_a in 0.0f64..=1.0,
            trait_b in 0.0f64..=1.0,
        ) {
            let scorer = CompatibilityScorer::new();
            let a = Profile {
                user_id: "a".to_string(),
                display_name: "a".to_string(),
                skills: skills_a,
                tier: Some(ExperienceTier::Mid),
                traits: Some(TraitVector::uniform(trait_a)),
                preferences: MatchingPreferences::default(),
            };
            let b = Profile {
                user_id: "b".to_string(),
                display_name: "b".to_string(),
                skills: skills_b,
                tier: Some(ExperienceTier::Senior),
                traits: Some(TraitVector::uniform(trait_b)),
                preferences: MatchingPreferences::default(),
            };

            let score = scorer.score(&a, &b, None);
            prop_assert!(score.total >= 0.0);
            prop_assert!(score.total <= 100.0);

            let reverse = scorer.score(&b, &a, None);
            prop_assert!((score.total - reverse.total).abs() < 1e-9);
        }
    }
}
