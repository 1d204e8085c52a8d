//! 公共验证函数模块
//! 提供用户 ID、单词、学习尝试等外部输入的校验，在任何状态修改之前执行。
use crate::constants::{KEY_SEPARATOR, MAX_WORD_CHARS};
use crate::learning::types::{LearningAttempt, LearningDifficulty};

/// 验证用户 ID：非空、不含键分隔符
pub fn validate_user_id(user_id: &str) -> Result<(), &'static str> {
    if user_id.trim().is_empty() {
        return Err("user_id must not be empty");
    }
    if user_id.contains(KEY_SEPARATOR) {
        return Err("user_id must not contain ':'");
    }
    Ok(())
}

/// 验证单词：非空、长度受限、不含键分隔符
pub fn validate_word(word: &str) -> Result<(), &'static str> {
    if word.trim().is_empty() {
        return Err("word must not be empty");
    }
    if word.chars().count() > MAX_WORD_CHARS {
        return Err("word is too long");
    }
    if word.contains(KEY_SEPARATOR) {
        return Err("word must not contain ':'");
    }
    Ok(())
}

pub fn parse_difficulty(value: u8) -> Result<LearningDifficulty, String> {
    LearningDifficulty::try_from(value)
}

/// 验证一次学习尝试
pub fn validate_attempt(attempt: &LearningAttempt) -> Result<(), String> {
    validate_word(&attempt.word).map_err(str::to_string)?;
    if !attempt.response_time.is_finite() {
        return Err("response_time must be a finite number".to_string());
    }
    if attempt.response_time < 0.0 {
        return Err(format!(
            "response_time must be >= 0, got {}",
            attempt.response_time
        ));
    }
    if let Some(confidence) = attempt.confidence_score {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(format!(
                "confidence_score must be within [0, 1], got {confidence}"
            ));
        }
    }
    Ok(())
}

pub fn validate_accuracy_target(target: f64) -> Result<(), &'static str> {
    if !(0.0..=1.0).contains(&target) {
        return Err("accuracy_target must be within [0, 1]");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_attempt_accepted() {
        let attempt = LearningAttempt::new("apple", true, 2.5);
        assert!(validate_attempt(&attempt).is_ok());
    }

    #[test]
    fn negative_response_time_rejected() {
        let attempt = LearningAttempt::new("apple", true, -0.1);
        assert!(validate_attempt(&attempt).unwrap_err().contains(">= 0"));
    }

    #[test]
    fn nan_response_time_rejected() {
        let attempt = LearningAttempt::new("apple", true, f64::NAN);
        assert!(validate_attempt(&attempt).is_err());
    }

    #[test]
    fn empty_word_rejected() {
        let attempt = LearningAttempt::new("  ", true, 1.0);
        assert!(validate_attempt(&attempt).is_err());
    }

    #[test]
    fn out_of_range_confidence_rejected() {
        let mut attempt = LearningAttempt::new("apple", true, 1.0);
        attempt.confidence_score = Some(1.5);
        assert!(validate_attempt(&attempt).is_err());
    }

    #[test]
    fn separator_in_ids_rejected() {
        assert!(validate_user_id("a:b").is_err());
        assert!(validate_word("x:y").is_err());
        assert!(validate_user_id("alice").is_ok());
    }

    #[test]
    fn unicode_word_length_counts_characters() {
        assert!(validate_word(&"词".repeat(MAX_WORD_CHARS)).is_ok());
        assert!(validate_word(&"词".repeat(MAX_WORD_CHARS + 1)).is_err());
    }

    #[test]
    fn unknown_tier_rejected() {
        assert!(parse_difficulty(0).is_err());
        assert!(parse_difficulty(7).is_err());
        assert_eq!(parse_difficulty(6).unwrap(), LearningDifficulty::Expert);
    }

    #[test]
    fn accuracy_target_bounds() {
        assert!(validate_accuracy_target(0.8).is_ok());
        assert!(validate_accuracy_target(1.2).is_err());
    }
}
