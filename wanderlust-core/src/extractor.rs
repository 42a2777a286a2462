//! Keyword-regex preference extractor.
//!
//! Deterministic, no model involved: an ordered list of independent rules is
//! run over lower-cased visitor text and every rule that matches adds its
//! fixed points to one or more traits. It is a heuristic signal generator,
//! so false positives and misses are expected.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::score_map::ScoreMap;

/// One keyword rule as written in a rules file.
///
/// ```toml
/// [[rule]]
/// name = "beach"
/// pattern = '\b(beach|ocean|island)\b'
/// boosts = { beach = 8, tropical = 5 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRule {
    pub name: String,
    pub pattern: String,
    pub boosts: BTreeMap<String, u8>,
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    rule: Vec<ExtractionRule>,
}

// (name, pattern, boosts) in evaluation order.
const DEFAULT_RULES: &[(&str, &str, &[(&str, u8)])] = &[
    // vibe
    (
        "beach",
        r"\b(beach(es)?|ocean|seaside|islands?|sand|surf(ing)?|coast(al)?|snorkel\w*)\b",
        &[("beach", 8), ("tropical", 5)],
    ),
    (
        "culture",
        r"\b(culture|cultural|history|historic(al)?|museums?|art|galleries|temples?|architecture|heritage|ruins)\b",
        &[("culture", 8)],
    ),
    (
        "adventure",
        r"\b(adventur\w*|hik(e|es|ing)|trek\w*|climb\w*|explor\w*|outdoors?|div(e|ing)|rafting|bungee)\b",
        &[("adventure", 8), ("nature", 5)],
    ),
    (
        "nature",
        r"\b(nature|mountains?|national parks?|wildlife|lakes?|forests?|waterfalls?)\b",
        &[("nature", 7)],
    ),
    (
        "nightlife",
        r"\b(nightlife|party|parties|partying|clubs?|clubbing|bars?|dancing|live music)\b",
        &[("nightlife", 8)],
    ),
    (
        "food",
        r"\b(food\w*|cuisine|eat(ing)?|restaurants?|culinary|street food|wine|tasting)\b",
        &[("food", 8)],
    ),
    // budget
    (
        "budget",
        r"\b(budget|cheap|affordable|backpack\w*|hostels?|save money|low[- ]cost|inexpensive)\b",
        &[("budget", 8)],
    ),
    (
        "luxury",
        r"\b(luxury|luxurious|five[- ]star|5[- ]star|spa|resorts?|splurge|high[- ]end|villas?)\b",
        &[("luxury", 8)],
    ),
    (
        "midrange",
        r"\b(mid[- ]?range|moderate|comfortable|reasonable|not too expensive)\b",
        &[("midrange", 6)],
    ),
    // duration
    (
        "short",
        r"\b(weekend|short (trip|break)|few days|city break|[2-4] days)\b",
        &[("short", 6)],
    ),
    (
        "long",
        r"\b(months?|weeks|long (trip|stay)|sabbatical|extended|gap year)\b",
        &[("long", 6)],
    ),
    // climate
    (
        "hot",
        r"\b(hot|warm|sunny|sunshine|heat|tropical)\b",
        &[("hot", 7)],
    ),
    (
        "cold",
        r"\b(cold|snow\w*|ski(ing)?|winter|cool|chilly|northern lights|aurora)\b",
        &[("cold", 7)],
    ),
    // companions
    (
        "solo",
        r"\b(solo|alone|by myself|on my own)\b",
        &[("solo", 9)],
    ),
    (
        "romantic",
        r"\b(romantic|romance|honeymoon|partner|couple|anniversary|girlfriend|boyfriend|wife|husband)\b",
        &[("romantic", 9)],
    ),
    (
        "friends",
        r"\b(friends|group|buddies|mates|squad|bachelor(ette)?)\b",
        &[("friends", 8)],
    ),
    (
        "family",
        r"\b(family|kids|children|child|toddlers?|parents)\b",
        &[("family", 9)],
    ),
];

/// Built-in rule table.
pub fn default_rules() -> Vec<ExtractionRule> {
    DEFAULT_RULES
        .iter()
        .map(|(name, pattern, boosts)| ExtractionRule {
            name: name.to_string(),
            pattern: pattern.to_string(),
            boosts: boosts.iter().map(|(t, p)| (t.to_string(), *p)).collect(),
        })
        .collect()
}

#[derive(Debug, Clone)]
struct CompiledRule {
    name: String,
    regex: Regex,
    boosts: BTreeMap<String, u8>,
}

/// Compiled rule set; build once at startup and share.
#[derive(Debug, Clone)]
pub struct PreferenceExtractor {
    rules: Vec<CompiledRule>,
}

impl PreferenceExtractor {
    pub fn new(rules: Vec<ExtractionRule>) -> Result<Self> {
        let rules = rules
            .into_iter()
            .map(|r| {
                let regex = Regex::new(&r.pattern)
                    .with_context(|| format!("compile extraction rule {}", r.name))?;
                Ok(CompiledRule {
                    name: r.name,
                    regex,
                    boosts: r.boosts,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(default_rules())
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: RuleFile = toml::from_str(s).context("parse extraction rules")?;
        Self::new(file.rule)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        Self::from_toml_str(&s).with_context(|| format!("load {}", path.display()))
    }

    /// Score one piece of visitor text. Each rule fires at most once.
    pub fn extract(&self, text: &str) -> ScoreMap {
        let lower = text.to_lowercase();
        let mut scores = ScoreMap::new();
        for rule in self.rules.iter().filter(|r| r.regex.is_match(&lower)) {
            for (t, points) in &rule.boosts {
                scores.add(t.as_str(), f64::from(*points));
            }
        }
        scores
    }

    /// Names of the rules that fire on `text`, in rule order.
    pub fn matched_rules(&self, text: &str) -> Vec<&str> {
        let lower = text.to_lowercase();
        self.rules
            .iter()
            .filter(|r| r.regex.is_match(&lower))
            .map(|r| r.name.as_str())
            .collect()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}
