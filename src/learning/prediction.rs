use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::learning::types::{LearningDifficulty, LearningProfile, MasteryRecord};

const HISTORY_WEIGHT: f64 = 0.4;
const RECENCY_WEIGHT: f64 = 0.3;
const RETENTION_WEIGHT: f64 = 0.2;
const DIFFICULTY_WEIGHT: f64 = 0.1;
const RECENCY_DECAY_PER_DAY: f64 = 0.1;
const NEW_WORD_FLOOR: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictedWord {
    pub word: String,
    pub predicted_accuracy: f64,
    pub tracked: bool,
}

/// Probability estimate that the next answer for each word will be correct.
pub fn predict_performance(
    profile: &LearningProfile,
    words: &[String],
    mastery: &HashMap<String, MasteryRecord>,
    now: DateTime<Utc>,
) -> Vec<PredictedWord> {
    let tier_gap = (profile.preferred_difficulty.value() as f64
        - LearningDifficulty::Intermediate.value() as f64)
        .abs();
    let difficulty_match = 1.0 - tier_gap * 0.1;

    words
        .iter()
        .map(|word| match mastery.get(word) {
            Some(record) => {
                let days = record.days_since_review(now).max(0.0);
                let recency = (-days * RECENCY_DECAY_PER_DAY).exp();
                let predicted = record.accuracy_rate() * HISTORY_WEIGHT
                    + recency * RECENCY_WEIGHT
                    + record.retention_strength * RETENTION_WEIGHT
                    + difficulty_match * DIFFICULTY_WEIGHT;
                PredictedWord {
                    word: word.clone(),
                    predicted_accuracy: predicted.clamp(0.0, 1.0),
                    tracked: true,
                }
            }
            None => PredictedWord {
                word: word.clone(),
                predicted_accuracy: (profile.accuracy_target * 0.8).max(NEW_WORD_FLOOR),
                tracked: false,
            },
        })
        .collect()
}
