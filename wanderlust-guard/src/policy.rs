//! Content policy tables.
//!
//! Plain data: a built-in default plus an optional TOML file, so wording and
//! keyword lists change without a rebuild. [`crate::SafetyFilter`] compiles a
//! policy once at startup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_REDIRECT: &str = "I'm here to help you find your perfect travel destination! \
Let's keep the conversation on trips. What kind of getaway are you dreaming of?";

const INJECTION_PATTERNS: &[&str] = &[
    r"ignore\s+(all\s+)?(the\s+)?(previous|prior|above|earlier)\s+(instructions|prompts?|rules)",
    r"disregard\s+(all\s+)?(the\s+)?(previous|prior|above|your)\s+(instructions|prompts?|rules)",
    r"forget\s+(all\s+)?(your|previous|prior|the)\s+(instructions|rules|prompts?)",
    r"forget\s+everything",
    r"you\s+are\s+now",
    r"pretend\s+(to\s+be|you\s*(['’]re|\s+are))",
    r"\bact\s+as\b",
    r"\bdan\b",
    r"do\s+anything\s+now",
    r"developer\s+mode",
    r"jailbreak",
    r"system\s+prompt",
    r"reveal\s+(your|the)\s+(system\s+)?(prompt|instructions)",
    r"new\s+instructions\s*:",
    r"<\s*script",
    r"javascript\s*:",
    r"\beval\s*\(",
    r"\bbase64\b",
    r"\[/?inst\]",
    r"<\|im_(start|end)\|>",
    r"###\s*(system|instruction)",
];

const BLOCKED_TOPICS: &[&str] = &[
    "politics",
    "political",
    "election",
    "democrat",
    "republican",
    "religion",
    "religious",
    "terrorism",
    "terrorist",
    "make a bomb",
    "build a bomb",
    "weapon",
    "firearm",
    "violence",
    "violent",
    "murder",
    "suicide",
    "self-harm",
    "self harm",
    "kill myself",
    "racist",
    "racism",
    "nazi",
    "hate speech",
    "porn",
    "cocaine",
    "heroin",
    "drug deal",
];

const TRAVEL_KEYWORDS: &[&str] = &[
    "travel",
    "trip",
    "destination",
    "beach",
    "city",
    "country",
    "visit",
    "explore",
    "adventure",
    "hotel",
    "flight",
    "vacation",
    "holiday",
    "tour",
    "culture",
    "food",
    "budget",
    "weather",
    "climate",
    "island",
    "mountain",
    "museum",
    "journey",
    "getaway",
    "stay",
    "resort",
    "itinerary",
    "sightseeing",
    "nightlife",
    "backpack",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentPolicy {
    /// Case-insensitive regexes that mark a prompt-injection attempt.
    pub injection_patterns: Vec<String>,
    /// Case-insensitive substrings that block a message or reply.
    pub blocked_topics: Vec<String>,
    /// A long reply must mention at least one of these to count as on topic.
    pub travel_keywords: Vec<String>,
    /// Substituted for anything rejected.
    pub redirect_message: String,
    pub max_input_chars: usize,
    pub max_output_chars: usize,
    /// Replies at or below this length skip the on-topic check.
    pub off_topic_min_chars: usize,
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self {
            injection_patterns: INJECTION_PATTERNS.iter().map(|s| s.to_string()).collect(),
            blocked_topics: BLOCKED_TOPICS.iter().map(|s| s.to_string()).collect(),
            travel_keywords: TRAVEL_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            redirect_message: DEFAULT_REDIRECT.to_string(),
            max_input_chars: 500,
            max_output_chars: 1000,
            off_topic_min_chars: 100,
        }
    }
}

impl ContentPolicy {
    /// Missing keys fall back to the defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parse content policy")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        Self::from_toml_str(&s).with_context(|| format!("load {}", path.display()))
    }
}
