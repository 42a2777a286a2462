//! Trait vocabulary and the question dimensions that group it.

use serde::{Deserialize, Serialize};

use crate::score_map::ScoreMap;

/// Every trait the built-in catalog, quiz and extractor know about.
pub const TRAITS: &[&str] = &[
    "beach", "tropical", "culture", "adventure", "nature", "nightlife", "food", "budget",
    "luxury", "midrange", "short", "long", "hot", "cold", "solo", "romantic", "friends",
    "family",
];

/// One topic the quiz/chat asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Vibe,
    Budget,
    Duration,
    Climate,
    Companions,
}

impl Dimension {
    /// Question order.
    pub const ALL: [Dimension; 5] = [
        Dimension::Vibe,
        Dimension::Budget,
        Dimension::Duration,
        Dimension::Climate,
        Dimension::Companions,
    ];

    pub fn traits(&self) -> &'static [&'static str] {
        match self {
            Dimension::Vibe => &["beach", "culture", "adventure", "nightlife", "food"],
            Dimension::Budget => &["budget", "luxury", "midrange"],
            Dimension::Duration => &["short", "long"],
            Dimension::Climate => &["hot", "cold"],
            Dimension::Companions => &["solo", "romantic", "friends", "family"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Vibe => "vibe",
            Dimension::Budget => "budget",
            Dimension::Duration => "duration",
            Dimension::Climate => "climate",
            Dimension::Companions => "companions",
        }
    }

    /// A dimension is covered once any of its traits has a positive score.
    pub fn is_covered(&self, scores: &ScoreMap) -> bool {
        self.traits().iter().any(|t| scores.get(t) > 0.0)
    }
}

/// Human label for a trait key, used in replies.
pub fn trait_label(trait_name: &str) -> &str {
    match trait_name {
        "beach" => "beaches",
        "tropical" => "tropical scenery",
        "culture" => "culture and history",
        "adventure" => "adventure",
        "nature" => "nature",
        "nightlife" => "nightlife",
        "food" => "food",
        "budget" => "good value",
        "luxury" => "luxury",
        "midrange" => "comfort on a sensible budget",
        "short" => "short breaks",
        "long" => "long stays",
        "hot" => "warm weather",
        "cold" => "cool weather",
        "solo" => "solo travel",
        "romantic" => "romance",
        "friends" => "group trips",
        "family" => "family travel",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_traits_are_in_vocabulary() {
        for d in Dimension::ALL {
            for t in d.traits() {
                assert!(TRAITS.contains(t), "{t} missing from vocabulary");
            }
        }
    }

    #[test]
    fn test_dimension_coverage() {
        let scores = ScoreMap::new().with("luxury", 8.0);
        assert!(Dimension::Budget.is_covered(&scores));
        assert!(!Dimension::Vibe.is_covered(&scores));
    }
}
