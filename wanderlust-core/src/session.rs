//! Per-visitor score accumulation across turns.
//!
//! A `Session` is a plain value: the caller passes it into each turn and
//! keeps (or serializes) the result. Nothing here is global.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::destination::Catalog;
use crate::extractor::PreferenceExtractor;
use crate::matcher::{top_matches, MatchSummary};
use crate::quiz::Quiz;
use crate::score_map::ScoreMap;
use crate::traits::Dimension;

/// Matches kept in a results snapshot.
pub const SNAPSHOT_SIZE: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub scores: ScoreMap,
    pub question_count: u32,
}

/// What a client keeps in session storage after the quiz/chat finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSnapshot {
    pub top_matches: Vec<MatchSummary>,
    pub scores: ScoreMap,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from client-held state.
    pub fn resume(scores: ScoreMap, question_count: u32) -> Self {
        Self {
            scores,
            question_count,
        }
    }

    /// Score one new visitor message and fold it in. Returns the delta.
    pub fn absorb_message(&mut self, extractor: &PreferenceExtractor, text: &str) -> ScoreMap {
        let delta = extractor.extract(text);
        self.scores.merge(&delta);
        self.question_count = self.question_count.saturating_add(1);
        delta
    }

    /// Fold in a quiz option.
    pub fn absorb_answer(
        &mut self,
        quiz: &Quiz,
        question_id: &str,
        option_id: &str,
    ) -> anyhow::Result<ScoreMap> {
        let delta = quiz.answer(question_id, option_id)?.clone();
        self.scores.merge(&delta);
        self.question_count = self.question_count.saturating_add(1);
        Ok(delta)
    }

    /// Dimensions with no signal yet, in question order.
    pub fn missing_dimensions(&self) -> Vec<Dimension> {
        Dimension::ALL
            .into_iter()
            .filter(|d| !d.is_covered(&self.scores))
            .collect()
    }

    /// Enough questions asked, or every dimension already has a signal.
    pub fn ready_for_results(&self, max_questions: u32) -> bool {
        self.question_count >= max_questions
            || (self.question_count > 0 && self.missing_dimensions().is_empty())
    }

    pub fn snapshot(&self, catalog: &Catalog, now: DateTime<Utc>) -> ResultsSnapshot {
        ResultsSnapshot {
            top_matches: top_matches(&self.scores, catalog, SNAPSHOT_SIZE)
                .iter()
                .map(|m| m.summary())
                .collect(),
            scores: self.scores.clone(),
            created_at: now,
        }
    }
}
