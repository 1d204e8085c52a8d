use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::learning::types::{LearningAttempt, LearningProfile, MasteryRecord};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyTimeEstimate {
    pub review_time_minutes: f64,
    pub daily_optimal_minutes: u32,
    pub words_needing_review: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningAnalytics {
    pub profile: LearningProfile,
    pub total_words_studied: usize,
    pub mastered_words: usize,
    pub mastery_percentage: f64,
    pub average_mastery_level: f64,
    pub words_needing_review: usize,
    pub recent_attempts_count: usize,
    pub recent_accuracy: f64,
    pub learning_streak_days: u32,
    pub estimated_study_time: StudyTimeEstimate,
}

/// Consecutive calendar days of study ending at the most recent study day.
pub fn learning_streak(study_days: &BTreeSet<NaiveDate>) -> u32 {
    let mut days = study_days.iter().rev();
    let Some(mut current) = days.next().copied() else {
        return 0;
    };

    let mut streak = 1;
    for day in days {
        if current.pred_opt() == Some(*day) {
            streak += 1;
            current = *day;
        } else {
            break;
        }
    }
    streak
}

pub fn summarize(
    profile: &LearningProfile,
    mastery: &HashMap<String, MasteryRecord>,
    recent_attempts: &[LearningAttempt],
    study_days: &BTreeSet<NaiveDate>,
    now: DateTime<Utc>,
) -> LearningAnalytics {
    let total = mastery.len();
    let mastered = mastery.values().filter(|r| r.is_mastered()).count();
    let needing_review = mastery.values().filter(|r| r.needs_review(now)).count();
    let mastery_sum: f64 = mastery.values().map(|r| r.mastery_level).sum();
    let denominator = total.max(1) as f64;

    let recent_correct = recent_attempts.iter().filter(|a| a.is_correct).count();
    let recent_accuracy = recent_correct as f64 / recent_attempts.len().max(1) as f64;

    // 每词思考加作答时间按平均响应时间的两倍估算
    let per_word_secs = profile.average_response_time * 2.0;

    LearningAnalytics {
        profile: profile.clone(),
        total_words_studied: total,
        mastered_words: mastered,
        mastery_percentage: mastered as f64 / denominator * 100.0,
        average_mastery_level: mastery_sum / denominator,
        words_needing_review: needing_review,
        recent_attempts_count: recent_attempts.len(),
        recent_accuracy,
        learning_streak_days: learning_streak(study_days),
        estimated_study_time: StudyTimeEstimate {
            review_time_minutes: needing_review as f64 * per_word_secs / 60.0,
            daily_optimal_minutes: profile.optimal_session_length,
            words_needing_review: needing_review,
        },
    }
}
