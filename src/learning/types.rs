use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DIFFICULTY_HISTORY_LEN, SECONDS_PER_DAY};

/// Ordinal difficulty tier. Persisted by its integer value so stored profiles
/// and attempts stay readable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum LearningDifficulty {
    Beginner = 1,
    Elementary = 2,
    Intermediate = 3,
    UpperIntermediate = 4,
    Advanced = 5,
    Expert = 6,
}

impl LearningDifficulty {
    pub const MIN: LearningDifficulty = LearningDifficulty::Beginner;
    pub const MAX: LearningDifficulty = LearningDifficulty::Expert;

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Beginner => "BEGINNER",
            Self::Elementary => "ELEMENTARY",
            Self::Intermediate => "INTERMEDIATE",
            Self::UpperIntermediate => "UPPER_INTERMEDIATE",
            Self::Advanced => "ADVANCED",
            Self::Expert => "EXPERT",
        }
    }

    /// One tier harder, saturating at `Expert`.
    pub fn harder(self) -> Self {
        Self::try_from(self.value().saturating_add(1)).unwrap_or(Self::MAX)
    }

    /// One tier easier, saturating at `Beginner`.
    pub fn easier(self) -> Self {
        Self::try_from(self.value().saturating_sub(1)).unwrap_or(Self::MIN)
    }
}

impl Default for LearningDifficulty {
    fn default() -> Self {
        Self::Intermediate
    }
}

impl TryFrom<u8> for LearningDifficulty {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Beginner),
            2 => Ok(Self::Elementary),
            3 => Ok(Self::Intermediate),
            4 => Ok(Self::UpperIntermediate),
            5 => Ok(Self::Advanced),
            6 => Ok(Self::Expert),
            other => Err(format!("unknown difficulty tier: {other}")),
        }
    }
}

impl From<LearningDifficulty> for u8 {
    fn from(value: LearningDifficulty) -> Self {
        value.value()
    }
}

impl fmt::Display for LearningDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningStyle {
    Visual,
    Auditory,
    Kinesthetic,
    Reading,
    #[default]
    Mixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningProfile {
    pub user_id: String,
    pub learning_style: LearningStyle,
    pub preferred_difficulty: LearningDifficulty,
    /// Minutes.
    pub optimal_session_length: u32,
    pub optimal_words_per_session: u32,
    pub accuracy_target: f64,
    /// Seconds, exponentially smoothed over recorded attempts.
    pub average_response_time: f64,
    pub learning_velocity: f64,
    pub retention_rate: f64,
    #[serde(default = "default_true")]
    pub prefers_context: bool,
    #[serde(default = "default_true")]
    pub prefers_examples: bool,
    #[serde(default)]
    pub prefers_images: bool,
    #[serde(default)]
    pub prefers_audio: bool,
    /// Attempts recorded since the tier was last reassessed.
    #[serde(default)]
    pub attempts_since_adjustment: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl LearningProfile {
    pub fn new(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            learning_style: LearningStyle::Mixed,
            preferred_difficulty: LearningDifficulty::Intermediate,
            optimal_session_length: 20,
            optimal_words_per_session: 25,
            accuracy_target: 0.8,
            average_response_time: 3.0,
            learning_velocity: 1.0,
            retention_rate: 0.7,
            prefers_context: true,
            prefers_examples: true,
            prefers_images: false,
            prefers_audio: false,
            attempts_since_adjustment: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Per-user, per-word mastery state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryRecord {
    pub word: String,
    pub mastery_level: f64,
    pub confidence_level: f64,
    pub retention_strength: f64,
    pub last_reviewed: DateTime<Utc>,
    pub review_count: u32,
    pub correct_count: u32,
    pub total_attempts: u32,
    pub average_response_time: f64,
    pub next_review_time: DateTime<Utc>,
    pub forgetting_curve_factor: f64,
    #[serde(default)]
    pub difficulty_progression: VecDeque<LearningDifficulty>,
}

impl MasteryRecord {
    /// A record for a word seen for the first time. Due immediately.
    pub fn new(word: &str, now: DateTime<Utc>, initial_easiness: f64) -> Self {
        Self {
            word: word.to_string(),
            mastery_level: 0.0,
            confidence_level: 0.5,
            retention_strength: 0.5,
            last_reviewed: now,
            review_count: 0,
            correct_count: 0,
            total_attempts: 0,
            average_response_time: 0.0,
            next_review_time: now,
            forgetting_curve_factor: initial_easiness,
            difficulty_progression: VecDeque::with_capacity(DIFFICULTY_HISTORY_LEN),
        }
    }

    pub fn accuracy_rate(&self) -> f64 {
        if self.total_attempts == 0 {
            0.0
        } else {
            self.correct_count as f64 / self.total_attempts as f64
        }
    }

    pub fn needs_review(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_review_time
    }

    pub fn is_mastered(&self) -> bool {
        self.mastery_level >= 0.9 && self.confidence_level >= 0.8 && self.accuracy_rate() >= 0.9
    }

    /// Days past `next_review_time`; negative while the word is not yet due.
    pub fn days_overdue(&self, now: DateTime<Utc>) -> f64 {
        days_between(self.next_review_time, now)
    }

    pub fn days_since_review(&self, now: DateTime<Utc>) -> f64 {
        days_between(self.last_reviewed, now)
    }

    pub(crate) fn push_difficulty(&mut self, difficulty: LearningDifficulty) {
        self.difficulty_progression.push_back(difficulty);
        while self.difficulty_progression.len() > DIFFICULTY_HISTORY_LEN {
            self.difficulty_progression.pop_front();
        }
    }
}

pub(crate) fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningAttempt {
    pub word: String,
    #[serde(default)]
    pub user_answer: String,
    #[serde(default)]
    pub correct_answer: String,
    pub is_correct: bool,
    /// Seconds.
    pub response_time: f64,
    #[serde(default)]
    pub difficulty_level: LearningDifficulty,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub hint_used: bool,
    #[serde(default)]
    pub context: Option<String>,
}

impl LearningAttempt {
    pub fn new(word: &str, is_correct: bool, response_time: f64) -> Self {
        Self {
            word: word.to_string(),
            user_answer: String::new(),
            correct_answer: String::new(),
            is_correct,
            response_time,
            difficulty_level: LearningDifficulty::default(),
            timestamp: Utc::now(),
            confidence_score: None,
            hint_used: false,
            context: None,
        }
    }
}

/// Facts produced by the core. Callers decide how (and whether) to publish them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum DomainEvent {
    AttemptRecorded {
        user_id: String,
        word: String,
        is_correct: bool,
        response_time: f64,
        mastery_level: f64,
        next_review_time: DateTime<Utc>,
    },
    DifficultyIncreased {
        user_id: String,
        old_difficulty: LearningDifficulty,
        new_difficulty: LearningDifficulty,
        performance_score: f64,
    },
    DifficultyDecreased {
        user_id: String,
        old_difficulty: LearningDifficulty,
        new_difficulty: LearningDifficulty,
        performance_score: f64,
    },
    VocabularySelected {
        user_id: String,
        total_count: usize,
        review_words: usize,
        low_mastery_words: usize,
        new_words: usize,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AttemptRecorded { .. } => "attempt_recorded",
            Self::DifficultyIncreased { .. } => "difficulty_increased",
            Self::DifficultyDecreased { .. } => "difficulty_decreased",
            Self::VocabularySelected { .. } => "vocabulary_selected",
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            Self::AttemptRecorded { user_id, .. }
            | Self::DifficultyIncreased { user_id, .. }
            | Self::DifficultyDecreased { user_id, .. }
            | Self::VocabularySelected { user_id, .. } => user_id,
        }
    }
}
