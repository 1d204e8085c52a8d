use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::constants::{LOCK_TABLE_PRUNE_THRESHOLD, RECENT_ACTIVITY_DAYS};
use crate::learning::analytics::{self, LearningAnalytics};
use crate::learning::config::LearningConfig;
use crate::learning::difficulty::{self, DifficultyDecision};
use crate::learning::error::{LearningError, PersistenceScope};
use crate::learning::prediction::{self, PredictedWord};
use crate::learning::recorder;
use crate::learning::repository::LearningRepository;
use crate::learning::types::{
    DomainEvent, LearningAttempt, LearningProfile, LearningStyle, MasteryRecord,
};
use crate::learning::word_selector::{self, Selection};
use crate::validation::{
    parse_difficulty, validate_accuracy_target, validate_attempt, validate_user_id, validate_word,
};

/// Keyed async mutexes. Idle entries are pruned once the table grows large.
#[derive(Default)]
struct LockTable {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockTable {
    async fn acquire(&self, key: String) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;

        // strong_count == 1: only the table holds it, nobody is waiting.
        if locks.len() > LOCK_TABLE_PRUNE_THRESHOLD {
            locks.retain(|_, v| Arc::strong_count(v) > 1);
        }

        locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Partial profile edit. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub learning_style: Option<LearningStyle>,
    pub preferred_difficulty: Option<u8>,
    pub accuracy_target: Option<f64>,
    pub optimal_session_length: Option<u32>,
    pub optimal_words_per_session: Option<u32>,
    pub learning_velocity: Option<f64>,
    pub prefers_context: Option<bool>,
    pub prefers_examples: Option<bool>,
    pub prefers_images: Option<bool>,
    pub prefers_audio: Option<bool>,
}

impl ProfileUpdate {
    fn apply(&self, profile: &mut LearningProfile) -> Result<(), LearningError> {
        let difficulty = self
            .preferred_difficulty
            .map(parse_difficulty)
            .transpose()
            .map_err(LearningError::Validation)?;
        if let Some(target) = self.accuracy_target {
            validate_accuracy_target(target).map_err(LearningError::validation)?;
        }
        if self.optimal_session_length == Some(0) || self.optimal_words_per_session == Some(0) {
            return Err(LearningError::validation("session sizes must be positive"));
        }
        if let Some(velocity) = self.learning_velocity {
            if !velocity.is_finite() || velocity <= 0.0 {
                return Err(LearningError::validation("learning_velocity must be positive"));
            }
        }

        if let Some(style) = self.learning_style {
            profile.learning_style = style;
        }
        if let Some(difficulty) = difficulty {
            profile.preferred_difficulty = difficulty;
        }
        if let Some(target) = self.accuracy_target {
            profile.accuracy_target = target;
        }
        if let Some(minutes) = self.optimal_session_length {
            profile.optimal_session_length = minutes;
        }
        if let Some(words) = self.optimal_words_per_session {
            profile.optimal_words_per_session = words;
        }
        if let Some(velocity) = self.learning_velocity {
            profile.learning_velocity = velocity;
        }
        if let Some(v) = self.prefers_context {
            profile.prefers_context = v;
        }
        if let Some(v) = self.prefers_examples {
            profile.prefers_examples = v;
        }
        if let Some(v) = self.prefers_images {
            profile.prefers_images = v;
        }
        if let Some(v) = self.prefers_audio {
            profile.prefers_audio = v;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOutcome {
    pub record: MasteryRecord,
    pub events: Vec<DomainEvent>,
    /// Present when this attempt triggered a tier reassessment.
    pub difficulty: Option<DifficultyDecision>,
    /// `false` when the mastery update committed but the profile bookkeeping
    /// (response time, tier) could not be saved.
    pub profile_persisted: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyOutcome {
    #[serde(flatten)]
    pub decision: DifficultyDecision,
    pub events: Vec<DomainEvent>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionOutcome {
    #[serde(flatten)]
    pub selection: Selection,
    pub events: Vec<DomainEvent>,
}

/// 学习核心的组合根：串联记录、调度、难度调整与选词，并负责并发控制。
///
/// 同一 (user, word) 的尝试串行执行；同一用户的档案读改写串行执行。
/// 不同单词、不同用户之间互不阻塞。领域事件只返回，不发布。
pub struct LearningManager {
    config: LearningConfig,
    repo: Arc<dyn LearningRepository>,
    record_locks: LockTable,
    profile_locks: LockTable,
}

impl LearningManager {
    pub fn new(
        config: LearningConfig,
        repo: Arc<dyn LearningRepository>,
    ) -> Result<Self, LearningError> {
        config.validate().map_err(LearningError::Validation)?;
        Ok(Self {
            config,
            repo,
            record_locks: LockTable::default(),
            profile_locks: LockTable::default(),
        })
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    fn load_or_new_profile(&self, user_id: &str) -> Result<(LearningProfile, bool), LearningError> {
        match self
            .repo
            .load_profile(user_id)
            .map_err(LearningError::persistence(PersistenceScope::Profile))?
        {
            Some(profile) => Ok((profile, false)),
            None => Ok((LearningProfile::new(user_id, Utc::now()), true)),
        }
    }

    pub async fn get_or_create_profile(&self, user_id: &str) -> Result<LearningProfile, LearningError> {
        validate_user_id(user_id).map_err(LearningError::validation)?;

        let lock = self.profile_locks.acquire(user_id.to_string()).await;
        let _guard = lock.lock().await;

        let (profile, created) = self.load_or_new_profile(user_id)?;
        if created {
            self.repo
                .save_profile(&profile)
                .map_err(LearningError::persistence(PersistenceScope::Profile))?;
            tracing::info!(user_id, "Learning profile created");
        }
        Ok(profile)
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> Result<LearningProfile, LearningError> {
        validate_user_id(user_id).map_err(LearningError::validation)?;

        let lock = self.profile_locks.acquire(user_id.to_string()).await;
        let _guard = lock.lock().await;

        let (mut profile, _) = self.load_or_new_profile(user_id)?;
        update.apply(&mut profile)?;
        profile.updated_at = Utc::now();
        self.repo
            .save_profile(&profile)
            .map_err(LearningError::persistence(PersistenceScope::Profile))?;

        tracing::info!(user_id, tier = %profile.preferred_difficulty, "Learning profile updated");
        Ok(profile)
    }

    /// Applies one answered question to the word's mastery record.
    ///
    /// The attempt row and the updated record are committed together; if that
    /// commit fails nothing changed. Profile bookkeeping runs afterwards and
    /// its failure is reported through `profile_persisted` only.
    pub async fn record_attempt(
        &self,
        user_id: &str,
        attempt: LearningAttempt,
    ) -> Result<AttemptOutcome, LearningError> {
        validate_user_id(user_id).map_err(LearningError::validation)?;
        validate_attempt(&attempt).map_err(LearningError::Validation)?;

        let record = {
            let lock = self
                .record_locks
                .acquire(format!("{user_id}:{}", attempt.word))
                .await;
            let _guard = lock.lock().await;

            let now = Utc::now();
            let current = self
                .repo
                .load_mastery(user_id, &attempt.word)
                .map_err(LearningError::persistence(PersistenceScope::Mastery))?
                .unwrap_or_else(|| {
                    MasteryRecord::new(&attempt.word, now, self.config.scheduler.initial_easiness)
                });

            let updated = recorder::apply_attempt(&current, &attempt, now, &self.config.scheduler)?;
            self.repo
                .commit_attempt(user_id, &attempt, &updated)
                .map_err(LearningError::persistence(PersistenceScope::Mastery))?;
            updated
        };

        tracing::debug!(
            user_id,
            word = %record.word,
            is_correct = attempt.is_correct,
            mastery_level = record.mastery_level,
            next_review_time = %record.next_review_time,
            "Attempt recorded"
        );

        let mut events = vec![DomainEvent::AttemptRecorded {
            user_id: user_id.to_string(),
            word: record.word.clone(),
            is_correct: attempt.is_correct,
            response_time: attempt.response_time,
            mastery_level: record.mastery_level,
            next_review_time: record.next_review_time,
        }];

        let (difficulty, profile_persisted) = self
            .update_profile_after_attempt(user_id, &attempt)
            .await;
        if let Some(event) = difficulty.as_ref().and_then(|d| d.event(user_id)) {
            events.push(event);
        }

        Ok(AttemptOutcome {
            record,
            events,
            difficulty,
            profile_persisted,
        })
    }

    async fn update_profile_after_attempt(
        &self,
        user_id: &str,
        attempt: &LearningAttempt,
    ) -> (Option<DifficultyDecision>, bool) {
        let lock = self.profile_locks.acquire(user_id.to_string()).await;
        let _guard = lock.lock().await;

        let mut profile = match self.load_or_new_profile(user_id) {
            Ok((profile, _)) => profile,
            Err(error) => {
                tracing::warn!(user_id, error = %error, "Profile load failed after attempt commit");
                return (None, false);
            }
        };

        let alpha = self.config.manager.response_time_alpha;
        profile.average_response_time =
            alpha * attempt.response_time + (1.0 - alpha) * profile.average_response_time;
        profile.attempts_since_adjustment = profile.attempts_since_adjustment.saturating_add(1);

        let adjust_every = self.config.manager.adjust_every;
        let mut decision = None;
        if adjust_every > 0 && profile.attempts_since_adjustment >= adjust_every {
            match self
                .repo
                .recent_attempts(user_id, self.config.manager.difficulty_window)
            {
                Ok(recent) => {
                    let d = difficulty::adjust_difficulty(&profile, &recent, &self.config.difficulty);
                    if d.changed() {
                        tracing::info!(
                            user_id,
                            old_tier = %d.previous,
                            tier = %d.difficulty,
                            score = d.performance.map(|p| p.score).unwrap_or_default(),
                            "Difficulty tier adjusted"
                        );
                    }
                    profile.preferred_difficulty = d.difficulty;
                    profile.attempts_since_adjustment = 0;
                    decision = Some(d);
                }
                Err(error) => {
                    tracing::warn!(user_id, error = %error, "Skipping tier reassessment, attempt history unavailable");
                }
            }
        }

        profile.updated_at = Utc::now();
        match self.repo.save_profile(&profile) {
            Ok(()) => (decision, true),
            Err(error) => {
                tracing::warn!(user_id, error = %error, "Profile save failed after attempt commit");
                (decision, false)
            }
        }
    }

    /// Reassesses the tier now from the most recent attempts.
    pub async fn adjust_difficulty(&self, user_id: &str) -> Result<DifficultyOutcome, LearningError> {
        validate_user_id(user_id).map_err(LearningError::validation)?;

        let lock = self.profile_locks.acquire(user_id.to_string()).await;
        let _guard = lock.lock().await;

        let (mut profile, _) = self.load_or_new_profile(user_id)?;
        let recent = self
            .repo
            .recent_attempts(user_id, self.config.manager.difficulty_window)
            .map_err(LearningError::persistence(PersistenceScope::Attempt))?;

        let decision = difficulty::adjust_difficulty(&profile, &recent, &self.config.difficulty);
        profile.preferred_difficulty = decision.difficulty;
        profile.attempts_since_adjustment = 0;
        profile.updated_at = Utc::now();
        self.repo
            .save_profile(&profile)
            .map_err(LearningError::persistence(PersistenceScope::Profile))?;

        if decision.changed() {
            tracing::info!(
                user_id,
                old_tier = %decision.previous,
                tier = %decision.difficulty,
                "Difficulty tier adjusted on demand"
            );
        }

        let events = decision.event(user_id).into_iter().collect();
        Ok(DifficultyOutcome { decision, events })
    }

    /// Builds the next study batch. `target_count` defaults to the profile's
    /// words-per-session.
    pub async fn select_words(
        &self,
        user_id: &str,
        available_words: &[String],
        target_count: Option<usize>,
    ) -> Result<SelectionOutcome, LearningError> {
        validate_user_id(user_id).map_err(LearningError::validation)?;
        for word in available_words {
            validate_word(word).map_err(LearningError::validation)?;
        }

        let profile = self.get_or_create_profile(user_id).await?;
        let target = target_count.unwrap_or(match profile.optimal_words_per_session {
            0 => self.config.manager.default_batch_size,
            n => n as usize,
        });

        let mastery = self
            .repo
            .load_user_mastery(user_id)
            .map_err(LearningError::persistence(PersistenceScope::Mastery))?;

        let selection = word_selector::select_next_words(
            &profile,
            available_words,
            &mastery,
            target,
            Utc::now(),
            &self.config.selector,
        );

        tracing::debug!(
            user_id,
            total = selection.words.len(),
            review = selection.review_count,
            low_mastery = selection.low_mastery_count,
            new = selection.new_count,
            "Vocabulary selected"
        );

        let events = vec![selection.event(user_id)];
        Ok(SelectionOutcome { selection, events })
    }

    pub async fn get_mastery(&self, user_id: &str, word: &str) -> Result<MasteryRecord, LearningError> {
        validate_user_id(user_id).map_err(LearningError::validation)?;
        validate_word(word).map_err(LearningError::validation)?;

        self.repo
            .load_mastery(user_id, word)
            .map_err(LearningError::persistence(PersistenceScope::Mastery))?
            .ok_or_else(|| LearningError::not_found("mastery", &format!("{user_id}:{word}")))
    }

    /// Due records, most overdue first.
    pub async fn due_words(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<MasteryRecord>, LearningError> {
        validate_user_id(user_id).map_err(LearningError::validation)?;
        let limit = limit.unwrap_or(self.config.manager.default_batch_size);

        self.repo
            .due_mastery(user_id, Utc::now(), limit)
            .map_err(LearningError::persistence(PersistenceScope::Mastery))
    }

    /// Retires the word's record. Records are never deleted.
    pub async fn archive_word(&self, user_id: &str, word: &str) -> Result<MasteryRecord, LearningError> {
        validate_user_id(user_id).map_err(LearningError::validation)?;
        validate_word(word).map_err(LearningError::validation)?;

        let lock = self.record_locks.acquire(format!("{user_id}:{word}")).await;
        let _guard = lock.lock().await;

        let archived = self
            .repo
            .archive_mastery(user_id, word, Utc::now())
            .map_err(LearningError::persistence(PersistenceScope::Attempt))?
            .ok_or_else(|| LearningError::not_found("mastery", &format!("{user_id}:{word}")))?;

        tracing::info!(user_id, word, "Mastery record archived");
        Ok(archived)
    }

    /// Previously archived records of a word, oldest first.
    pub async fn archived_history(
        &self,
        user_id: &str,
        word: &str,
    ) -> Result<Vec<MasteryRecord>, LearningError> {
        validate_user_id(user_id).map_err(LearningError::validation)?;
        validate_word(word).map_err(LearningError::validation)?;

        self.repo
            .archived_mastery(user_id, word)
            .map_err(LearningError::persistence(PersistenceScope::Mastery))
    }

    pub async fn predict(
        &self,
        user_id: &str,
        words: &[String],
    ) -> Result<Vec<PredictedWord>, LearningError> {
        validate_user_id(user_id).map_err(LearningError::validation)?;
        for word in words {
            validate_word(word).map_err(LearningError::validation)?;
        }

        let profile = self.get_or_create_profile(user_id).await?;
        let mastery = self
            .repo
            .load_user_mastery(user_id)
            .map_err(LearningError::persistence(PersistenceScope::Mastery))?;

        Ok(prediction::predict_performance(&profile, words, &mastery, Utc::now()))
    }

    pub async fn analytics(&self, user_id: &str) -> Result<LearningAnalytics, LearningError> {
        let profile = self.get_or_create_profile(user_id).await?;
        let now = Utc::now();

        let mastery = self
            .repo
            .load_user_mastery(user_id)
            .map_err(LearningError::persistence(PersistenceScope::Mastery))?;
        let recent = self
            .repo
            .attempts_since(user_id, now - Duration::days(RECENT_ACTIVITY_DAYS))
            .map_err(LearningError::persistence(PersistenceScope::Attempt))?;
        let study_days = self
            .repo
            .study_days(user_id)
            .map_err(LearningError::persistence(PersistenceScope::Attempt))?;

        Ok(analytics::summarize(&profile, &mastery, &recent, &study_days, now))
    }
}
