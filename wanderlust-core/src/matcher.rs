//! Weighted nearest-match ranking of the catalog against a ScoreMap.
//!
//! Scoring, per destination:
//! - every user trait with value > 0 contributes `weight = user / 10` to the
//!   maximum possible score
//! - when the destination defines the trait it also adds
//!   `(dest / 10) * weight` to the achieved score
//! - `percent = clamp(round(achieved / max * 100), 60, 99)`; with no user
//!   signal the ratio is 0.5
//!
//! Ranking is a stable sort on percent, so ties keep catalog order.

use serde::{Deserialize, Serialize};

use crate::destination::{Catalog, Destination};
use crate::score_map::ScoreMap;

pub const MIN_MATCH_PERCENT: u8 = 60;
pub const MAX_MATCH_PERCENT: u8 = 99;
/// User and destination must both reach this for a trait to be "matched".
pub const STRONG_TRAIT: f64 = 7.0;

const DEFAULT_RATIO: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DestinationMatch<'a> {
    pub destination: &'a Destination,
    pub match_percent: u8,
    pub matched_traits: Vec<String>,
}

impl DestinationMatch<'_> {
    pub fn summary(&self) -> MatchSummary {
        MatchSummary {
            id: self.destination.id.clone(),
            name: self.destination.name.clone(),
            country: self.destination.country.clone(),
            tagline: self.destination.tagline.clone(),
            match_percent: self.match_percent,
            matched_traits: self.matched_traits.clone(),
        }
    }
}

/// Owned projection of a match for payloads and snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub id: String,
    pub name: String,
    pub country: String,
    pub tagline: String,
    pub match_percent: u8,
    pub matched_traits: Vec<String>,
}

fn clamp_percent(ratio: f64) -> u8 {
    let ratio = if ratio.is_finite() { ratio } else { DEFAULT_RATIO };
    let pct = (ratio * 100.0).round();
    pct.clamp(f64::from(MIN_MATCH_PERCENT), f64::from(MAX_MATCH_PERCENT)) as u8
}

/// Score one destination.
pub fn score_destination<'a>(scores: &ScoreMap, destination: &'a Destination) -> DestinationMatch<'a> {
    let mut total = 0.0;
    let mut max_possible = 0.0;
    let mut matched_traits = Vec::new();

    for (t, user) in scores.positive() {
        let weight = user / 10.0;
        max_possible += weight;
        if let Some(dest) = destination.score(t) {
            let dest = f64::from(dest);
            total += (dest / 10.0) * weight;
            if user >= STRONG_TRAIT && dest >= STRONG_TRAIT {
                matched_traits.push(t.to_string());
            }
        }
    }

    let ratio = if max_possible > 0.0 {
        total / max_possible
    } else {
        DEFAULT_RATIO
    };

    DestinationMatch {
        destination,
        match_percent: clamp_percent(ratio),
        matched_traits,
    }
}

/// Rank every destination, best first. Pure and deterministic.
pub fn match_destinations<'a>(scores: &ScoreMap, destinations: &'a [Destination]) -> Vec<DestinationMatch<'a>> {
    let mut out: Vec<DestinationMatch<'a>> = destinations
        .iter()
        .map(|d| score_destination(scores, d))
        .collect();
    // Vec::sort_by is stable.
    out.sort_by(|a, b| b.match_percent.cmp(&a.match_percent));
    out
}

/// The first `n` ranked matches of a catalog.
pub fn top_matches<'a>(scores: &ScoreMap, catalog: &'a Catalog, n: usize) -> Vec<DestinationMatch<'a>> {
    let mut ranked = match_destinations(scores, catalog.destinations());
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_non_finite_ratio_uses_default() {
        assert_eq!(clamp_percent(f64::NAN), MIN_MATCH_PERCENT);
        assert_eq!(clamp_percent(f64::INFINITY), MIN_MATCH_PERCENT);
        assert_eq!(clamp_percent(1.0), MAX_MATCH_PERCENT);
    }

    fn dest(id: &str, scores: &[(&str, u8)]) -> Destination {
        Destination {
            id: id.to_string(),
            name: id.to_string(),
            country: "Testland".to_string(),
            region: String::new(),
            scores: scores
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
            tagline: String::new(),
            description: String::new(),
            best_time: String::new(),
            daily_budget_usd: 0,
            highlights: Vec::new(),
        }
    }

    #[test]
    fn test_perfect_fit_is_capped_at_99() {
        let d = dest("a", &[("beach", 10)]);
        let s = ScoreMap::new().with("beach", 8.0);
        assert_eq!(score_destination(&s, &d).match_percent, 99);
    }

    #[test]
    fn test_poor_fit_is_floored_at_60() {
        let d = dest("a", &[("beach", 1)]);
        let s = ScoreMap::new().with("beach", 8.0).with("culture", 8.0);
        assert_eq!(score_destination(&s, &d).match_percent, 60);
    }

    #[test]
    fn test_weighted_ratio() {
        // beach: weight 1.0 * 0.8 = 0.8; culture: weight 1.0 * 0.6 = 0.6 → 1.4 / 2.0 = 70%
        let d = dest("a", &[("beach", 8), ("culture", 6)]);
        let s = ScoreMap::new().with("beach", 10.0).with("culture", 10.0);
        assert_eq!(score_destination(&s, &d).match_percent, 70);
    }

    #[test]
    fn test_heavier_user_trait_dominates() {
        // beach weight 2.0 * 0.9 = 1.8; solo weight 0.5 * 0.2 = 0.1 → 1.9 / 2.5 = 76%
        let d = dest("a", &[("beach", 9), ("solo", 2)]);
        let s = ScoreMap::new().with("beach", 20.0).with("solo", 5.0);
        assert_eq!(score_destination(&s, &d).match_percent, 76);
    }

    #[test]
    fn test_undefined_trait_counts_against() {
        // culture undefined: 0.9 / 2.0 = 45% → floor 60
        let d = dest("a", &[("beach", 9)]);
        let s = ScoreMap::new().with("beach", 10.0).with("culture", 10.0);
        assert_eq!(score_destination(&s, &d).match_percent, 60);
    }

    #[test]
    fn test_matched_traits_need_both_strong() {
        let d = dest("a", &[("beach", 9), ("food", 6), ("solo", 7)]);
        let s = ScoreMap::new()
            .with("beach", 7.0)
            .with("food", 9.0)
            .with("solo", 6.0);
        let m = score_destination(&s, &d);
        assert_eq!(m.matched_traits, vec!["beach".to_string()]);
    }

    #[test]
    fn test_empty_scores_keep_catalog_order() {
        let ds = vec![dest("a", &[("beach", 9)]), dest("b", &[("culture", 9)]), dest("c", &[])];
        let ranked = match_destinations(&ScoreMap::new(), &ds);
        let ids: Vec<&str> = ranked.iter().map(|m| m.destination.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(ranked.iter().all(|m| m.match_percent == 60));
    }

    #[test]
    fn test_sorted_descending_and_stable() {
        let ds = vec![
            dest("low", &[("beach", 2)]),
            dest("tie1", &[("beach", 8)]),
            dest("high", &[("beach", 10)]),
            dest("tie2", &[("beach", 8)]),
        ];
        let s = ScoreMap::new().with("beach", 9.0);
        let ranked = match_destinations(&s, &ds);
        let ids: Vec<&str> = ranked.iter().map(|m| m.destination.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "tie1", "tie2", "low"]);
    }

    #[test]
    fn test_summary_projection() {
        let d = dest("a", &[("beach", 10)]);
        let s = ScoreMap::new().with("beach", 8.0);
        let summary = score_destination(&s, &d).summary();
        assert_eq!(summary.id, "a");
        assert_eq!(summary.match_percent, 99);
        assert_eq!(summary.matched_traits, vec!["beach".to_string()]);
    }
}
