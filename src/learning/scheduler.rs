//! 间隔重复调度：基于 SM-2 易度因子与遗忘曲线计算下次复习时间

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::constants::{
    MAX_EASINESS, MAX_INTERVAL_DAYS, MIN_EASINESS, MIN_INTERVAL_DAYS, SECONDS_PER_DAY,
};
use crate::learning::config::SchedulerConfig;
use crate::learning::types::{days_between, MasteryRecord};

/// Performance at or above this value counts as a successful recall.
pub const GOOD_PERFORMANCE: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSchedule {
    pub next_review_time: DateTime<Utc>,
    pub forgetting_curve_factor: f64,
    pub interval_days: f64,
}

fn clamp_finite(value: f64, min: f64, max: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        min
    }
}

fn normalize_performance(performance: f64) -> f64 {
    clamp_finite(performance, 0.0, 5.0)
}

/// SM-2 easiness adjustment for a 0-5 performance grade.
pub fn easiness_delta(performance: f64) -> f64 {
    let miss = 5.0 - performance;
    0.1 - miss * (0.08 + miss * 0.02)
}

/// Interval in days before mastery and retention scaling.
fn seed_interval_days(
    record: &MasteryRecord,
    performance: f64,
    now: DateTime<Utc>,
    config: &SchedulerConfig,
) -> f64 {
    match record.review_count {
        0 => config.first_interval_days,
        1 => config.second_interval_days,
        _ => {
            let easiness = clamp_finite(
                record.forgetting_curve_factor + easiness_delta(performance),
                MIN_EASINESS,
                MAX_EASINESS,
            );
            let previous_interval_days = days_between(record.last_reviewed, now);
            previous_interval_days * easiness
        }
    }
}

pub fn next_interval_days(
    record: &MasteryRecord,
    performance: f64,
    now: DateTime<Utc>,
    config: &SchedulerConfig,
) -> f64 {
    let performance = normalize_performance(performance);
    let mut interval_days = seed_interval_days(record, performance, now, config);

    let mastery_factor = 1.0 + (record.mastery_level - 0.5) * 2.0;
    interval_days *= mastery_factor;

    let retention_factor = 0.5 + record.retention_strength * 0.5;
    interval_days *= retention_factor;

    clamp_finite(interval_days, MIN_INTERVAL_DAYS, MAX_INTERVAL_DAYS)
}

pub fn update_forgetting_factor(current: f64, performance: f64) -> f64 {
    let performance = normalize_performance(performance);
    let factor = if performance >= GOOD_PERFORMANCE {
        current + easiness_delta(performance)
    } else {
        (current - 0.8 + 0.28 * performance - 0.02 * performance * performance).max(MIN_EASINESS)
    };
    clamp_finite(factor, MIN_EASINESS, MAX_EASINESS)
}

/// 计算下次复习时间与新的遗忘曲线因子。纯函数，不修改记录。
pub fn compute_next_review(
    record: &MasteryRecord,
    performance: f64,
    now: DateTime<Utc>,
    config: &SchedulerConfig,
) -> ReviewSchedule {
    let interval_days = next_interval_days(record, performance, now, config);
    let interval_ms = (interval_days * SECONDS_PER_DAY * 1000.0).round() as i64;

    // 时钟回拨时以 last_reviewed 为基准，保证 next_review_time 不早于它
    let base = now.max(record.last_reviewed);

    ReviewSchedule {
        next_review_time: base + Duration::milliseconds(interval_ms),
        forgetting_curve_factor: update_forgetting_factor(
            record.forgetting_curve_factor,
            performance,
        ),
        interval_days,
    }
}
