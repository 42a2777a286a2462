//! Destination reference data.
//!
//! The catalog is loaded once at startup (built-in JSON or a file named in
//! config) and never mutated afterwards.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Highest per-trait value a destination may carry.
pub const MAX_DESTINATION_SCORE: u8 = 10;

const BUILTIN_CATALOG: &str = include_str!("../data/destinations.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub id: String,
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub region: String,
    /// Trait → 0..=10.
    pub scores: BTreeMap<String, u8>,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub best_time: String,
    #[serde(default)]
    pub daily_budget_usd: u32,
    #[serde(default)]
    pub highlights: Vec<String>,
}

impl Destination {
    /// The destination's value for `trait_name`, if it defines one.
    pub fn score(&self, trait_name: &str) -> Option<u8> {
        self.scores.get(trait_name).copied()
    }
}

/// Immutable, validated list of destinations in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    destinations: Vec<Destination>,
}

impl Catalog {
    /// Validate and wrap a destination list.
    ///
    /// Rejects empty lists, duplicate or blank ids, and trait values above
    /// [`MAX_DESTINATION_SCORE`].
    pub fn new(destinations: Vec<Destination>) -> Result<Self> {
        if destinations.is_empty() {
            bail!("catalog is empty");
        }
        let mut seen: HashSet<&str> = HashSet::new();
        for d in destinations.iter() {
            if d.id.trim().is_empty() {
                bail!("destination {:?} has a blank id", d.name);
            }
            if !seen.insert(d.id.as_str()) {
                bail!("duplicate destination id: {}", d.id);
            }
            if let Some((t, v)) = d.scores.iter().find(|(_, v)| **v > MAX_DESTINATION_SCORE) {
                bail!(
                    "destination {}: trait {t} = {v} exceeds {MAX_DESTINATION_SCORE}",
                    d.id
                );
            }
        }
        drop(seen);
        Ok(Self { destinations })
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let destinations: Vec<Destination> =
            serde_json::from_str(s).context("parse destination catalog")?;
        Self::new(destinations)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        Self::from_json_str(&s).with_context(|| format!("load {}", path.display()))
    }

    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    pub fn get(&self, id: &str) -> Option<&Destination> {
        self.destinations.iter().find(|d| d.id == id)
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }
}
