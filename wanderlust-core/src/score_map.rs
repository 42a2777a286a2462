//! Sparse trait → weight accumulator for one visitor session.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Longest trait key accepted from untrusted input.
pub const MAX_TRAIT_KEY_LEN: usize = 32;
/// Most traits kept from untrusted input.
pub const MAX_TRAITS: usize = 32;
/// Ceiling for a single accumulated weight. A full quiz plus chat stays far below it.
pub const MAX_TRAIT_WEIGHT: f64 = 1000.0;

/// Accumulated preference weights keyed by trait name.
///
/// Values are never negative. Adding is the only way scores change, so a
/// map built over several turns is simply the sum of each turn's delta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct ScoreMap {
    scores: BTreeMap<String, f64>,
}

impl ScoreMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `points` to `trait_name`, saturating at [`MAX_TRAIT_WEIGHT`].
    /// Negative or non-finite points are ignored.
    pub fn add(&mut self, trait_name: impl Into<String>, points: f64) {
        if !points.is_finite() || points < 0.0 {
            return;
        }
        let w = self.scores.entry(trait_name.into()).or_insert(0.0);
        *w = (*w + points).min(MAX_TRAIT_WEIGHT);
    }

    /// Builder-style [`ScoreMap::add`].
    pub fn with(mut self, trait_name: impl Into<String>, points: f64) -> Self {
        self.add(trait_name, points);
        self
    }

    /// Add every entry of `other` into `self`.
    pub fn merge(&mut self, other: &ScoreMap) {
        for (k, v) in other.iter() {
            self.add(k, v);
        }
    }

    pub fn get(&self, trait_name: &str) -> f64 {
        self.scores.get(trait_name).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.scores.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Traits with a strictly positive weight.
    pub fn positive(&self) -> impl Iterator<Item = (&str, f64)> {
        self.iter().filter(|(_, v)| *v > 0.0)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// True when no trait carries a positive weight.
    pub fn is_empty(&self) -> bool {
        self.positive().next().is_none()
    }

    /// Strongest traits first; ties broken by key order.
    pub fn top(&self, n: usize) -> Vec<(&str, f64)> {
        let mut all: Vec<(&str, f64)> = self.positive().collect();
        all.sort_by(|a, b| b.1.total_cmp(&a.1));
        all.truncate(n);
        all
    }
}

impl From<BTreeMap<String, f64>> for ScoreMap {
    /// Keeps only well-formed entries: non-empty short keys with finite,
    /// non-negative weights, at most [`MAX_TRAITS`] of them. Weights above
    /// [`MAX_TRAIT_WEIGHT`] are capped.
    fn from(raw: BTreeMap<String, f64>) -> Self {
        let scores = raw
            .into_iter()
            .filter(|(k, v)| {
                !k.is_empty() && k.len() <= MAX_TRAIT_KEY_LEN && v.is_finite() && *v >= 0.0
            })
            .take(MAX_TRAITS)
            .map(|(k, v)| (k, v.min(MAX_TRAIT_WEIGHT)))
            .collect();
        Self { scores }
    }
}

impl From<ScoreMap> for BTreeMap<String, f64> {
    fn from(map: ScoreMap) -> Self {
        map.scores
    }
}

impl FromIterator<(String, f64)> for ScoreMap {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut map = ScoreMap::new();
        for (k, v) in iter {
            map.add(k, v);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_accumulates() {
        let mut s = ScoreMap::new();
        s.add("beach", 8.0);
        s.add("beach", 5.0);
        assert_eq!(s.get("beach"), 13.0);
        assert_eq!(s.get("culture"), 0.0);
    }

    #[test]
    fn test_negative_and_nan_ignored() {
        let s = ScoreMap::new().with("beach", -3.0).with("food", f64::NAN);
        assert!(s.is_empty());
        assert_eq!(s.len(), 0);
    }

    #[test]
    fn test_untrusted_json_is_sanitized() {
        let long_key = "x".repeat(MAX_TRAIT_KEY_LEN + 1);
        let json = format!(r#"{{"beach": 9, "solo": -2, "": 4, "{long_key}": 3}}"#);
        let s: ScoreMap = serde_json::from_str(&json).unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s.get("beach"), 9.0);
    }

    #[test]
    fn test_weights_are_capped() {
        let s: ScoreMap = serde_json::from_str(r#"{"beach": 1.7e308, "solo": 12}"#).unwrap();
        assert_eq!(s.get("beach"), MAX_TRAIT_WEIGHT);
        assert_eq!(s.get("solo"), 12.0);

        let mut s = ScoreMap::new().with("food", MAX_TRAIT_WEIGHT - 1.0);
        s.add("food", f64::MAX);
        assert_eq!(s.get("food"), MAX_TRAIT_WEIGHT);
    }

    #[test]
    fn test_top_orders_by_weight() {
        let s = ScoreMap::new()
            .with("beach", 8.0)
            .with("luxury", 16.0)
            .with("solo", 9.0);
        let top = s.top(2);
        assert_eq!(top, vec![("luxury", 16.0), ("solo", 9.0)]);
    }

    #[test]
    fn test_zero_weights_count_as_empty() {
        let s = ScoreMap::new().with("beach", 0.0);
        assert_eq!(s.len(), 1);
        assert!(s.is_empty());
    }
}
