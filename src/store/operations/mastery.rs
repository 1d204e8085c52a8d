use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sled::transaction::{ConflictableTransactionResult, TransactionalTree};
use sled::Transactional;

use crate::learning::types::MasteryRecord;
use crate::store::keys;
use crate::store::{abort, map_tx_error, Store, StoreError};

fn due_key_for(user_id: &str, record: &MasteryRecord) -> Result<String, StoreError> {
    keys::due_index_key(
        user_id,
        record.next_review_time.timestamp_millis(),
        &record.word,
    )
}

/// Replaces the mastery value at `key` and moves its due-index entry, inside a
/// caller-owned transaction.
pub(crate) fn write_mastery_tx(
    tx_mastery: &TransactionalTree,
    tx_due_index: &TransactionalTree,
    user_id: &str,
    key: &str,
    value: &[u8],
    due_index_key: &str,
) -> ConflictableTransactionResult<(), StoreError> {
    if let Some(old_raw) = tx_mastery.get(key.as_bytes())? {
        let old: MasteryRecord = serde_json::from_slice(&old_raw)
            .map_err(|error| abort(StoreError::Serialization(error)))?;
        let old_due_key = due_key_for(user_id, &old).map_err(abort)?;
        tx_due_index.remove(old_due_key.as_bytes())?;
    }

    tx_mastery.insert(key.as_bytes(), value)?;
    tx_due_index.insert(due_index_key.as_bytes(), &[])?;
    Ok(())
}

impl Store {
    pub fn get_mastery(
        &self,
        user_id: &str,
        word: &str,
    ) -> Result<Option<MasteryRecord>, StoreError> {
        let key = keys::mastery_key(user_id, word)?;
        match self.word_mastery.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    #[cfg(test)]
    pub(crate) fn set_mastery(&self, user_id: &str, record: &MasteryRecord) -> Result<(), StoreError> {
        let key = keys::mastery_key(user_id, &record.word)?;
        let value = Self::serialize(record)?;
        let due_index_key = due_key_for(user_id, record)?;

        (&self.word_mastery, &self.mastery_due_index)
            .transaction(|(tx_mastery, tx_due_index)| {
                write_mastery_tx(
                    tx_mastery,
                    tx_due_index,
                    user_id,
                    &key,
                    &value,
                    &due_index_key,
                )
            })
            .map_err(map_tx_error)?;

        Ok(())
    }

    /// Snapshot of every tracked word for the user.
    pub fn list_user_mastery(
        &self,
        user_id: &str,
    ) -> Result<HashMap<String, MasteryRecord>, StoreError> {
        let prefix = keys::user_prefix(user_id)?;
        let mut records = HashMap::new();
        for item in self.word_mastery.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            let record: MasteryRecord = Self::deserialize(&value)?;
            records.insert(record.word.clone(), record);
        }
        Ok(records)
    }

    /// Records due at `now`, most overdue first.
    pub fn get_due_mastery(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<MasteryRecord>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let prefix = keys::user_prefix(user_id)?;
        let now_ms = now.timestamp_millis().max(0);
        let mut due = Vec::with_capacity(limit.min(256));
        let mut seen = HashSet::new();

        for item in self.mastery_due_index.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item?;
            let Some((due_ts_ms, word)) = keys::parse_due_index_key(&key) else {
                continue;
            };
            if due_ts_ms > now_ms {
                break;
            }

            // Index entries can briefly outlive an archive; trust the record.
            if let Some(record) = self.get_mastery(user_id, &word)? {
                let record_due_ms = record.next_review_time.timestamp_millis().max(0);
                if record_due_ms == due_ts_ms && seen.insert(word) {
                    due.push(record);
                    if due.len() >= limit {
                        break;
                    }
                }
            }
        }

        Ok(due)
    }

    /// Moves the record into the archive tree. Returns the archived record, or
    /// `None` if the word was not tracked.
    pub fn archive_mastery(
        &self,
        user_id: &str,
        word: &str,
        archived_at: DateTime<Utc>,
    ) -> Result<Option<MasteryRecord>, StoreError> {
        let key = keys::mastery_key(user_id, word)?;
        let archive_key = keys::mastery_archive_key(user_id, word, archived_at.timestamp_millis())?;

        let archived = (
            &self.word_mastery,
            &self.mastery_due_index,
            &self.word_mastery_archive,
        )
            .transaction(|(tx_mastery, tx_due_index, tx_archive)| {
                let Some(raw) = tx_mastery.remove(key.as_bytes())? else {
                    return Ok(None);
                };
                let record: MasteryRecord = serde_json::from_slice(&raw)
                    .map_err(|error| abort(StoreError::Serialization(error)))?;
                let due_key = due_key_for(user_id, &record).map_err(abort)?;
                tx_due_index.remove(due_key.as_bytes())?;
                tx_archive.insert(archive_key.as_bytes(), raw)?;
                Ok(Some(record))
            })
            .map_err(map_tx_error)?;

        Ok(archived)
    }

    pub fn list_archived_mastery(
        &self,
        user_id: &str,
        word: &str,
    ) -> Result<Vec<MasteryRecord>, StoreError> {
        let prefix = format!("{}:", keys::mastery_key(user_id, word)?);
        let mut records = Vec::new();
        for item in self.word_mastery_archive.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            records.push(Self::deserialize(&value)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::learning::types::MasteryRecord;
    use crate::store::Store;

    fn record(word: &str, due_offset_minutes: i64) -> MasteryRecord {
        let now = Utc::now();
        let mut r = MasteryRecord::new(word, now, 2.5);
        r.next_review_time = now + Duration::minutes(due_offset_minutes);
        r
    }

    #[test]
    fn due_mastery_is_ordered_and_limited() {
        let store = Store::temporary().unwrap();
        store.set_mastery("u1", &record("w1", -5)).unwrap();
        store.set_mastery("u1", &record("w2", -1)).unwrap();
        store.set_mastery("u1", &record("w3", -3)).unwrap();
        store.set_mastery("u1", &record("w4", 10)).unwrap();

        let due = store.get_due_mastery("u1", Utc::now(), 2).unwrap();
        let words: Vec<_> = due.iter().map(|r| r.word.as_str()).collect();
        assert_eq!(words, vec!["w1", "w3"]);
    }

    #[test]
    fn unbounded_due_limit_returns_everything_due() {
        let store = Store::temporary().unwrap();
        store.set_mastery("u1", &record("w1", -5)).unwrap();
        store.set_mastery("u1", &record("w2", 10)).unwrap();

        let due = store.get_due_mastery("u1", Utc::now(), usize::MAX).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].word, "w1");
    }

    #[test]
    fn rescheduling_moves_the_due_entry() {
        let store = Store::temporary().unwrap();
        let mut r = record("w1", -5);
        store.set_mastery("u1", &r).unwrap();

        r.next_review_time = Utc::now() + Duration::days(1);
        store.set_mastery("u1", &r).unwrap();

        assert!(store.get_due_mastery("u1", Utc::now(), 10).unwrap().is_empty());
        assert_eq!(store.mastery_due_index.len(), 1);
    }

    #[test]
    fn users_do_not_share_records() {
        let store = Store::temporary().unwrap();
        store.set_mastery("u1", &record("apple", 0)).unwrap();
        store.set_mastery("u10", &record("pear", 0)).unwrap();

        let u1 = store.list_user_mastery("u1").unwrap();
        assert_eq!(u1.len(), 1);
        assert!(u1.contains_key("apple"));
        assert!(store.get_mastery("u10", "apple").unwrap().is_none());
    }

    #[test]
    fn archive_moves_record_out_of_live_trees() {
        let store = Store::temporary().unwrap();
        store.set_mastery("u1", &record("apple", -1)).unwrap();

        let archived = store.archive_mastery("u1", "apple", Utc::now()).unwrap();
        assert_eq!(archived.map(|r| r.word), Some("apple".to_string()));
        assert!(store.get_mastery("u1", "apple").unwrap().is_none());
        assert!(store.get_due_mastery("u1", Utc::now(), 10).unwrap().is_empty());
        assert_eq!(store.list_archived_mastery("u1", "apple").unwrap().len(), 1);

        assert!(store.archive_mastery("u1", "apple", Utc::now()).unwrap().is_none());
    }
}
