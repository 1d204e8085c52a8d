use chrono::{DateTime, Utc};

use crate::constants::{PERFORMANCE_CORRECT, PERFORMANCE_INCORRECT, RETENTION_WINDOW_DAYS};
use crate::learning::config::SchedulerConfig;
use crate::learning::error::LearningError;
use crate::learning::scheduler;
use crate::learning::types::{LearningAttempt, MasteryRecord};
use crate::validation::validate_attempt;

/// Scheduler grade for an attempt. Confidence is deliberately not consulted.
pub fn performance_for(attempt: &LearningAttempt) -> f64 {
    if attempt.is_correct {
        PERFORMANCE_CORRECT
    } else {
        PERFORMANCE_INCORRECT
    }
}

/// 将一次学习尝试应用到掌握度记录上，返回更新后的新记录。
///
/// 校验在任何修改之前完成；失败时输入记录保持不变。步骤顺序影响数值结果：
/// confidence 使用本次尝试计入后的 accuracy_rate，retention 的时间因子
/// 使用更新前的 last_reviewed，调度器看到的是已更新掌握度但尚未更新
/// last_reviewed / review_count 的记录。
pub fn apply_attempt(
    record: &MasteryRecord,
    attempt: &LearningAttempt,
    now: DateTime<Utc>,
    config: &SchedulerConfig,
) -> Result<MasteryRecord, LearningError> {
    validate_attempt(attempt).map_err(LearningError::Validation)?;
    if attempt.word != record.word {
        return Err(LearningError::validation(format!(
            "attempt for '{}' applied to record of '{}'",
            attempt.word, record.word
        )));
    }

    let mut next = record.clone();

    next.total_attempts += 1;
    if attempt.is_correct {
        next.correct_count += 1;
    }

    let n = next.total_attempts as f64;
    next.average_response_time =
        (record.average_response_time * (n - 1.0) + attempt.response_time) / n;

    let mastery_impact = if attempt.is_correct { 0.1 } else { -0.1 };
    next.mastery_level = (next.mastery_level + mastery_impact).clamp(0.0, 1.0);

    let confidence_impact = (next.accuracy_rate() - 0.5) * 0.2;
    next.confidence_level = (next.confidence_level + confidence_impact).clamp(0.0, 1.0);

    let time_factor = (next.days_since_review(now) / RETENTION_WINDOW_DAYS).clamp(0.0, 1.0);
    let retention_impact = if attempt.is_correct { 0.1 } else { -0.2 };
    next.retention_strength =
        (next.retention_strength + retention_impact * (1.0 - time_factor)).clamp(0.0, 1.0);

    let schedule = scheduler::compute_next_review(&next, performance_for(attempt), now, config);
    next.next_review_time = schedule.next_review_time;
    next.forgetting_curve_factor = schedule.forgetting_curve_factor;

    next.last_reviewed = now.max(record.last_reviewed);
    next.review_count += 1;

    next.push_difficulty(attempt.difficulty_level);

    Ok(next)
}
