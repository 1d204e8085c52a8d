use serde::Serialize;

use crate::learning::config::DifficultyConfig;
use crate::learning::types::{DomainEvent, LearningAttempt, LearningDifficulty, LearningProfile};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceBreakdown {
    pub accuracy: f64,
    pub speed: f64,
    pub consistency: f64,
    pub confidence: f64,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyDecision {
    pub previous: LearningDifficulty,
    pub difficulty: LearningDifficulty,
    /// `None` when there were no attempts to assess.
    pub performance: Option<PerformanceBreakdown>,
}

impl DifficultyDecision {
    pub fn changed(&self) -> bool {
        self.previous != self.difficulty
    }

    /// Tier-change notification for the caller to publish.
    pub fn event(&self, user_id: &str) -> Option<DomainEvent> {
        let score = self.performance.map(|p| p.score)?;
        if self.difficulty > self.previous {
            Some(DomainEvent::DifficultyIncreased {
                user_id: user_id.to_string(),
                old_difficulty: self.previous,
                new_difficulty: self.difficulty,
                performance_score: score,
            })
        } else if self.difficulty < self.previous {
            Some(DomainEvent::DifficultyDecreased {
                user_id: user_id.to_string(),
                old_difficulty: self.previous,
                new_difficulty: self.difficulty,
                performance_score: score,
            })
        } else {
            None
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
fn std_dev(values: &[f64], mean: f64) -> f64 {
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// 综合表现分数 (0-1)：准确率、速度、一致性、信心度加权
pub fn performance_score(
    attempts: &[LearningAttempt],
    profile: &LearningProfile,
    config: &DifficultyConfig,
) -> Option<PerformanceBreakdown> {
    if attempts.is_empty() {
        return None;
    }

    let total = attempts.len() as f64;
    let accuracy = attempts.iter().filter(|a| a.is_correct).count() as f64 / total;

    let response_times: Vec<f64> = attempts.iter().map(|a| a.response_time).collect();
    let mean_time = mean(&response_times);

    let speed_ratio = profile.average_response_time / mean_time.max(0.1);
    let speed = (speed_ratio / 2.0).min(1.0);

    let consistency = if response_times.len() > 1 {
        let deviation = std_dev(&response_times, mean_time);
        (1.0 - deviation / mean_time.max(0.1)).max(0.0)
    } else {
        1.0
    };

    let reported: Vec<f64> = attempts.iter().filter_map(|a| a.confidence_score).collect();
    let confidence = if reported.is_empty() {
        config.default_confidence
    } else {
        mean(&reported)
    };

    let score = accuracy * config.accuracy_weight
        + speed * config.speed_weight
        + consistency * config.consistency_weight
        + confidence * config.confidence_weight;

    Some(PerformanceBreakdown {
        accuracy,
        speed,
        consistency,
        confidence,
        score,
    })
}

/// Raises or lowers the profile's tier by one step based on recent attempts.
/// Pure: the profile is not modified.
pub fn adjust_difficulty(
    profile: &LearningProfile,
    recent_attempts: &[LearningAttempt],
    config: &DifficultyConfig,
) -> DifficultyDecision {
    let previous = profile.preferred_difficulty;
    let performance = performance_score(recent_attempts, profile, config);

    let difficulty = match performance {
        Some(p) if p.score >= config.up_threshold => previous.harder(),
        Some(p) if p.score <= config.down_threshold => previous.easier(),
        _ => previous,
    };

    DifficultyDecision {
        previous,
        difficulty,
        performance,
    }
}
