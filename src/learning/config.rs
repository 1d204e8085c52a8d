use serde::{Deserialize, Serialize};

use crate::config::LearningEnvConfig;
use crate::constants::{INITIAL_EASINESS, MAX_EASINESS, MIN_EASINESS};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Easiness assigned to a record on its first attempt.
    #[serde(default = "default_initial_easiness")]
    pub initial_easiness: f64,
    #[serde(default = "default_first_interval_days")]
    pub first_interval_days: f64,
    #[serde(default = "default_second_interval_days")]
    pub second_interval_days: f64,
}

fn default_initial_easiness() -> f64 {
    INITIAL_EASINESS
}
fn default_first_interval_days() -> f64 {
    1.0
}
fn default_second_interval_days() -> f64 {
    6.0
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_easiness: default_initial_easiness(),
            first_interval_days: default_first_interval_days(),
            second_interval_days: default_second_interval_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DifficultyConfig {
    pub accuracy_weight: f64,
    pub speed_weight: f64,
    pub consistency_weight: f64,
    pub confidence_weight: f64,
    pub up_threshold: f64,
    pub down_threshold: f64,
    /// Used when no attempt in the window carries a self-reported confidence.
    #[serde(default = "default_confidence_fallback")]
    pub default_confidence: f64,
}

fn default_confidence_fallback() -> f64 {
    0.7
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            accuracy_weight: 0.4,
            speed_weight: 0.3,
            consistency_weight: 0.2,
            confidence_weight: 0.1,
            up_threshold: 0.85,
            down_threshold: 0.65,
            default_confidence: default_confidence_fallback(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectorConfig {
    pub overdue_weight: f64,
    pub mastery_weight: f64,
    pub accuracy_weight: f64,
    pub retention_weight: f64,
    /// Tracked words at or above this mastery are left out of the low-mastery
    /// tier. `None` keeps every available word eligible.
    #[serde(default)]
    pub low_mastery_ceiling: Option<f64>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            overdue_weight: 2.0,
            mastery_weight: 3.0,
            accuracy_weight: 2.0,
            retention_weight: 1.5,
            low_mastery_ceiling: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagerConfig {
    /// Attempts between automatic tier reassessments. 0 disables them.
    pub adjust_every: u32,
    /// Number of most recent attempts fed to the difficulty adjuster.
    pub difficulty_window: usize,
    /// Smoothing factor for the profile's average response time.
    pub response_time_alpha: f64,
    pub default_batch_size: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            adjust_every: 10,
            difficulty_window: 20,
            response_time_alpha: 0.1,
            default_batch_size: 20,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub difficulty: DifficultyConfig,
    #[serde(default)]
    pub selector: SelectorConfig,
    #[serde(default)]
    pub manager: ManagerConfig,
}

impl LearningConfig {
    pub fn from_env(env: &LearningEnvConfig) -> Self {
        let mut config = Self::default();
        config.manager.adjust_every = env.adjust_every;
        config.manager.difficulty_window = env.difficulty_window;
        config.manager.default_batch_size = env.default_batch_size;
        config
    }

    pub fn validate(&self) -> Result<(), String> {
        let s = &self.scheduler;
        if !(MIN_EASINESS..=MAX_EASINESS).contains(&s.initial_easiness) {
            return Err(format!(
                "scheduler.initialEasiness must be within [{MIN_EASINESS}, {MAX_EASINESS}], got {}",
                s.initial_easiness
            ));
        }
        if s.first_interval_days <= 0.0 || s.second_interval_days <= 0.0 {
            return Err("scheduler seed intervals must be positive".to_string());
        }

        let d = &self.difficulty;
        let weights = [
            d.accuracy_weight,
            d.speed_weight,
            d.consistency_weight,
            d.confidence_weight,
        ];
        if weights.iter().any(|w| *w < 0.0) {
            return Err("difficulty weights must be non-negative".to_string());
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(format!("difficulty weights must sum to 1.0, got {sum}"));
        }
        if !(0.0..=1.0).contains(&d.down_threshold)
            || !(0.0..=1.0).contains(&d.up_threshold)
            || d.down_threshold >= d.up_threshold
        {
            return Err(format!(
                "difficulty thresholds must satisfy 0 <= down < up <= 1, got down={} up={}",
                d.down_threshold, d.up_threshold
            ));
        }
        if !(0.0..=1.0).contains(&d.default_confidence) {
            return Err("difficulty.defaultConfidence must be within [0, 1]".to_string());
        }

        let sel = &self.selector;
        if [
            sel.overdue_weight,
            sel.mastery_weight,
            sel.accuracy_weight,
            sel.retention_weight,
        ]
        .iter()
        .any(|w| *w < 0.0)
        {
            return Err("selector weights must be non-negative".to_string());
        }
        if let Some(ceiling) = sel.low_mastery_ceiling {
            if !(0.0..=1.0).contains(&ceiling) {
                return Err("selector.lowMasteryCeiling must be within [0, 1]".to_string());
            }
        }

        let m = &self.manager;
        if m.difficulty_window == 0 {
            return Err("manager.difficultyWindow must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&m.response_time_alpha) || m.response_time_alpha == 0.0 {
            return Err("manager.responseTimeAlpha must be within (0, 1]".to_string());
        }
        if m.default_batch_size == 0 {
            return Err("manager.defaultBatchSize must be at least 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(LearningConfig::default().validate().is_ok());
    }

    #[test]
    fn weights_must_sum_to_one() {
        let mut cfg = LearningConfig::default();
        cfg.difficulty.speed_weight = 0.5;
        assert!(cfg.validate().unwrap_err().contains("sum to 1.0"));
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let mut cfg = LearningConfig::default();
        cfg.difficulty.down_threshold = 0.9;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn initial_easiness_outside_bounds_rejected() {
        let mut cfg = LearningConfig::default();
        cfg.scheduler.initial_easiness = 1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: LearningConfig =
            serde_json::from_str(r#"{"selector":{"overdueWeight":1.0,"masteryWeight":3.0,"accuracyWeight":2.0,"retentionWeight":1.5}}"#)
                .unwrap();
        assert_eq!(cfg.selector.overdue_weight, 1.0);
        assert_eq!(cfg.selector.low_mastery_ceiling, None);
        assert_eq!(cfg.manager.adjust_every, 10);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn single_nested_field_overrides_keep_other_defaults() {
        let cfg: LearningConfig = serde_json::from_str(
            r#"{"difficulty":{"upThreshold":0.9},"selector":{"overdueWeight":1.0},"manager":{"adjustEvery":5}}"#,
        )
        .unwrap();
        assert_eq!(cfg.difficulty.up_threshold, 0.9);
        assert_eq!(cfg.difficulty.down_threshold, 0.65);
        assert_eq!(cfg.difficulty.accuracy_weight, 0.4);
        assert_eq!(cfg.selector.overdue_weight, 1.0);
        assert_eq!(cfg.selector.mastery_weight, 3.0);
        assert_eq!(cfg.manager.adjust_every, 5);
        assert_eq!(cfg.manager.default_batch_size, 20);
        assert!(cfg.validate().is_ok());
    }
}
