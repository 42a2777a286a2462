//! Fixed-choice quiz: one question per dimension, each option carrying a
//! fixed score delta.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::score_map::ScoreMap;
use crate::traits::Dimension;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizOption {
    pub id: String,
    pub label: String,
    pub scores: ScoreMap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizQuestion {
    pub id: String,
    pub dimension: Dimension,
    pub prompt: String,
    pub options: Vec<QuizOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quiz {
    pub questions: Vec<QuizQuestion>,
}

type OptionRow = (&'static str, &'static str, &'static [(&'static str, f64)]);

fn question(id: &str, dimension: Dimension, prompt: &str, rows: &[OptionRow]) -> QuizQuestion {
    QuizQuestion {
        id: id.to_string(),
        dimension,
        prompt: prompt.to_string(),
        options: rows
            .iter()
            .map(|(oid, label, scores)| QuizOption {
                id: oid.to_string(),
                label: label.to_string(),
                scores: scores.iter().map(|(t, p)| (t.to_string(), *p)).collect(),
            })
            .collect(),
    }
}

impl Default for Quiz {
    fn default() -> Self {
        Self {
            questions: vec![
                question(
                    "vibe",
                    Dimension::Vibe,
                    "What does your ideal day away look like?",
                    &[
                        ("beach", "Lazing on a beach", &[("beach", 9.0), ("tropical", 6.0), ("hot", 4.0)]),
                        ("culture", "Museums, temples and old streets", &[("culture", 9.0)]),
                        ("adventure", "Hiking, diving, something wild", &[("adventure", 9.0), ("nature", 7.0)]),
                        ("nightlife", "Late dinners and later nights", &[("nightlife", 9.0), ("friends", 3.0)]),
                        ("food", "Eating my way through a city", &[("food", 9.0), ("culture", 3.0)]),
                    ],
                ),
                question(
                    "budget",
                    Dimension::Budget,
                    "How are you thinking about budget?",
                    &[
                        ("budget", "Keep it cheap", &[("budget", 9.0)]),
                        ("midrange", "Comfortable, not extravagant", &[("midrange", 8.0)]),
                        ("luxury", "Treat myself", &[("luxury", 9.0)]),
                    ],
                ),
                question(
                    "duration",
                    Dimension::Duration,
                    "How long can you get away for?",
                    &[
                        ("short", "A long weekend", &[("short", 8.0)]),
                        ("week", "About a week", &[("short", 4.0), ("long", 4.0)]),
                        ("long", "Two weeks or more", &[("long", 8.0)]),
                    ],
                ),
                question(
                    "climate",
                    Dimension::Climate,
                    "Sun or snow?",
                    &[
                        ("hot", "Hot and sunny", &[("hot", 8.0), ("tropical", 4.0)]),
                        ("mild", "Mild is fine", &[("hot", 4.0), ("cold", 2.0)]),
                        ("cold", "Crisp air, maybe snow", &[("cold", 8.0)]),
                    ],
                ),
                question(
                    "companions",
                    Dimension::Companions,
                    "Who's coming along?",
                    &[
                        ("solo", "Just me", &[("solo", 9.0)]),
                        ("partner", "My partner", &[("romantic", 9.0)]),
                        ("friends", "A group of friends", &[("friends", 9.0), ("nightlife", 3.0)]),
                        ("family", "The family", &[("family", 9.0)]),
                    ],
                ),
            ],
        }
    }
}

impl Quiz {
    pub fn question(&self, question_id: &str) -> Option<&QuizQuestion> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// Score delta for one selected option.
    pub fn answer(&self, question_id: &str, option_id: &str) -> Result<&ScoreMap> {
        let q = self
            .question(question_id)
            .ok_or_else(|| anyhow!("unknown question: {question_id}"))?;
        q.options
            .iter()
            .find(|o| o.id == option_id)
            .map(|o| &o.scores)
            .ok_or_else(|| anyhow!("unknown option {option_id} for question {question_id}"))
    }

    /// Fold every selection into one ScoreMap, failing on the first unknown id.
    pub fn score_all(&self, selections: &BTreeMap<String, String>) -> Result<ScoreMap> {
        let mut total = ScoreMap::new();
        for (q, o) in selections {
            total.merge(self.answer(q, o)?);
        }
        Ok(total)
    }

    /// Like [`Quiz::score_all`] but skips unknown selections.
    pub fn score_known(&self, selections: &BTreeMap<String, String>) -> ScoreMap {
        let mut total = ScoreMap::new();
        for (q, o) in selections {
            if let Ok(delta) = self.answer(q, o) {
                total.merge(delta);
            }
        }
        total
    }
}
