use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sled::Transactional;
use uuid::Uuid;

use crate::learning::types::{LearningAttempt, MasteryRecord};
use crate::store::keys;
use crate::store::operations::mastery::write_mastery_tx;
use crate::store::{map_tx_error, Store, StoreError};

/// Stored attempt with its identity. The attempt fields are flattened so the
/// row reads like the attempt itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRow {
    pub id: String,
    pub user_id: String,
    #[serde(flatten)]
    pub attempt: LearningAttempt,
}

impl Store {
    /// 原子提交：尝试记录 + 掌握度记录 + 到期索引，三棵树要么全部写入，要么全部不写。
    pub fn commit_attempt(
        &self,
        user_id: &str,
        attempt: &LearningAttempt,
        record: &MasteryRecord,
    ) -> Result<AttemptRow, StoreError> {
        if attempt.word != record.word {
            return Err(StoreError::Validation(format!(
                "attempt word '{}' does not match record word '{}'",
                attempt.word, record.word
            )));
        }

        let row = AttemptRow {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            attempt: attempt.clone(),
        };
        let attempt_key =
            keys::attempt_key(user_id, attempt.timestamp.timestamp_millis(), &row.id)?;
        let attempt_value = Self::serialize(&row)?;

        let mastery_key = keys::mastery_key(user_id, &record.word)?;
        let mastery_value = Self::serialize(record)?;
        let due_index_key = keys::due_index_key(
            user_id,
            record.next_review_time.timestamp_millis(),
            &record.word,
        )?;

        (
            &self.learning_attempts,
            &self.word_mastery,
            &self.mastery_due_index,
        )
            .transaction(|(tx_attempts, tx_mastery, tx_due_index)| {
                tx_attempts.insert(attempt_key.as_bytes(), attempt_value.as_slice())?;
                write_mastery_tx(
                    tx_mastery,
                    tx_due_index,
                    user_id,
                    &mastery_key,
                    &mastery_value,
                    &due_index_key,
                )
            })
            .map_err(map_tx_error)?;

        Ok(row)
    }

    /// Newest first.
    pub fn recent_attempts(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<LearningAttempt>, StoreError> {
        let prefix = keys::user_prefix(user_id)?;
        let mut attempts = Vec::with_capacity(limit.min(256));
        for item in self.learning_attempts.scan_prefix(prefix.as_bytes()) {
            if attempts.len() >= limit {
                break;
            }
            let (_, value) = item?;
            let row: AttemptRow = Self::deserialize(&value)?;
            attempts.push(row.attempt);
        }
        Ok(attempts)
    }

    /// Attempts at or after `since`, newest first.
    pub fn attempts_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<LearningAttempt>, StoreError> {
        let prefix = keys::user_prefix(user_id)?;
        let mut attempts = Vec::new();
        for item in self.learning_attempts.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            let row: AttemptRow = Self::deserialize(&value)?;
            if row.attempt.timestamp < since {
                break;
            }
            attempts.push(row.attempt);
        }
        Ok(attempts)
    }

    /// Distinct UTC calendar days with at least one attempt.
    pub fn study_days(&self, user_id: &str) -> Result<BTreeSet<NaiveDate>, StoreError> {
        let prefix = keys::user_prefix(user_id)?;
        let mut days = BTreeSet::new();
        for item in self.learning_attempts.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            let row: AttemptRow = Self::deserialize(&value)?;
            days.insert(row.attempt.timestamp.date_naive());
        }
        Ok(days)
    }
}
