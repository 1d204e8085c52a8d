use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, Utc};

use crate::learning::types::{LearningAttempt, LearningProfile, MasteryRecord};
use crate::store::{Store, StoreError};

/// Persistence collaborator of the learning manager.
///
/// `commit_attempt` must be all-or-nothing: either the attempt row and the
/// updated record are both visible afterwards, or neither is.
pub trait LearningRepository: Send + Sync {
    fn load_profile(&self, user_id: &str) -> Result<Option<LearningProfile>, StoreError>;
    fn save_profile(&self, profile: &LearningProfile) -> Result<(), StoreError>;

    fn load_mastery(&self, user_id: &str, word: &str) -> Result<Option<MasteryRecord>, StoreError>;
    fn load_user_mastery(&self, user_id: &str)
        -> Result<HashMap<String, MasteryRecord>, StoreError>;
    fn due_mastery(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<MasteryRecord>, StoreError>;
    fn archive_mastery(
        &self,
        user_id: &str,
        word: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<MasteryRecord>, StoreError>;
    fn archived_mastery(&self, user_id: &str, word: &str)
        -> Result<Vec<MasteryRecord>, StoreError>;

    fn commit_attempt(
        &self,
        user_id: &str,
        attempt: &LearningAttempt,
        record: &MasteryRecord,
    ) -> Result<(), StoreError>;
    fn recent_attempts(&self, user_id: &str, limit: usize)
        -> Result<Vec<LearningAttempt>, StoreError>;
    fn attempts_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<LearningAttempt>, StoreError>;
    fn study_days(&self, user_id: &str) -> Result<BTreeSet<NaiveDate>, StoreError>;
}

impl LearningRepository for Store {
    fn load_profile(&self, user_id: &str) -> Result<Option<LearningProfile>, StoreError> {
        self.get_profile(user_id)
    }

    fn save_profile(&self, profile: &LearningProfile) -> Result<(), StoreError> {
        Store::save_profile(self, profile)
    }

    fn load_mastery(&self, user_id: &str, word: &str) -> Result<Option<MasteryRecord>, StoreError> {
        self.get_mastery(user_id, word)
    }

    fn load_user_mastery(
        &self,
        user_id: &str,
    ) -> Result<HashMap<String, MasteryRecord>, StoreError> {
        self.list_user_mastery(user_id)
    }

    fn due_mastery(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<MasteryRecord>, StoreError> {
        self.get_due_mastery(user_id, now, limit)
    }

    fn archive_mastery(
        &self,
        user_id: &str,
        word: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<MasteryRecord>, StoreError> {
        Store::archive_mastery(self, user_id, word, now)
    }

    fn archived_mastery(
        &self,
        user_id: &str,
        word: &str,
    ) -> Result<Vec<MasteryRecord>, StoreError> {
        self.list_archived_mastery(user_id, word)
    }

    fn commit_attempt(
        &self,
        user_id: &str,
        attempt: &LearningAttempt,
        record: &MasteryRecord,
    ) -> Result<(), StoreError> {
        Store::commit_attempt(self, user_id, attempt, record).map(|_| ())
    }

    fn recent_attempts(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<LearningAttempt>, StoreError> {
        Store::recent_attempts(self, user_id, limit)
    }

    fn attempts_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<LearningAttempt>, StoreError> {
        Store::attempts_since(self, user_id, since)
    }

    fn study_days(&self, user_id: &str) -> Result<BTreeSet<NaiveDate>, StoreError> {
        Store::study_days(self, user_id)
    }
}
