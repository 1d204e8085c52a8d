use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use adaptive_mastery::learning::{
    LearningAttempt, LearningConfig, LearningError, LearningManager, LearningProfile,
    LearningRepository, MasteryRecord, PersistenceScope,
};
use adaptive_mastery::store::{Store, StoreError};

fn open_store(dir: &tempfile::TempDir) -> Arc<Store> {
    let path = dir.path().join("flow.sled");
    let store = Arc::new(Store::open(path.to_str().unwrap()).expect("open store"));
    store.run_migrations().expect("migrations");
    store
}

/// Store wrapper whose writes can be switched to fail.
struct FlakyRepo {
    inner: Arc<Store>,
    fail_commit: AtomicBool,
    fail_profile_save: AtomicBool,
}

impl FlakyRepo {
    fn new(inner: Arc<Store>) -> Self {
        Self {
            inner,
            fail_commit: AtomicBool::new(false),
            fail_profile_save: AtomicBool::new(false),
        }
    }

    fn io_error() -> StoreError {
        StoreError::Sled(sled::Error::Io(std::io::Error::other("disk full")))
    }
}

impl LearningRepository for FlakyRepo {
    fn load_profile(&self, user_id: &str) -> Result<Option<LearningProfile>, StoreError> {
        self.inner.load_profile(user_id)
    }

    fn save_profile(&self, profile: &LearningProfile) -> Result<(), StoreError> {
        if self.fail_profile_save.load(Ordering::SeqCst) {
            return Err(Self::io_error());
        }
        LearningRepository::save_profile(self.inner.as_ref(), profile)
    }

    fn load_mastery(&self, user_id: &str, word: &str) -> Result<Option<MasteryRecord>, StoreError> {
        self.inner.load_mastery(user_id, word)
    }

    fn load_user_mastery(
        &self,
        user_id: &str,
    ) -> Result<HashMap<String, MasteryRecord>, StoreError> {
        self.inner.load_user_mastery(user_id)
    }

    fn due_mastery(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<MasteryRecord>, StoreError> {
        self.inner.due_mastery(user_id, now, limit)
    }

    fn archive_mastery(
        &self,
        user_id: &str,
        word: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<MasteryRecord>, StoreError> {
        LearningRepository::archive_mastery(self.inner.as_ref(), user_id, word, now)
    }

    fn archived_mastery(
        &self,
        user_id: &str,
        word: &str,
    ) -> Result<Vec<MasteryRecord>, StoreError> {
        self.inner.archived_mastery(user_id, word)
    }

    fn commit_attempt(
        &self,
        user_id: &str,
        attempt: &LearningAttempt,
        record: &MasteryRecord,
    ) -> Result<(), StoreError> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(Self::io_error());
        }
        LearningRepository::commit_attempt(self.inner.as_ref(), user_id, attempt, record)
    }

    fn recent_attempts(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<LearningAttempt>, StoreError> {
        LearningRepository::recent_attempts(self.inner.as_ref(), user_id, limit)
    }

    fn attempts_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<LearningAttempt>, StoreError> {
        LearningRepository::attempts_since(self.inner.as_ref(), user_id, since)
    }

    fn study_days(&self, user_id: &str) -> Result<BTreeSet<NaiveDate>, StoreError> {
        LearningRepository::study_days(self.inner.as_ref(), user_id)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_attempts_on_one_word_are_serialized() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let manager = Arc::new(LearningManager::new(LearningConfig::default(), store.clone()).unwrap());

    let mut handles = Vec::new();
    for i in 0..40 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            let attempt = LearningAttempt::new("apple", i % 4 != 0, 1.0 + (i % 5) as f64);
            manager.record_attempt("u1", attempt).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let record = store.get_mastery("u1", "apple").unwrap().unwrap();
    assert_eq!(record.total_attempts, 40);
    assert_eq!(record.correct_count, 30);
    assert_eq!(record.review_count, 40);
    // 1..=5 repeated evenly → mean 3.0
    assert!((record.average_response_time - 3.0).abs() < 1e-9);
    assert_eq!(store.recent_attempts("u1", 100).unwrap().len(), 40);

    let profile = manager.get_or_create_profile("u1").await.unwrap();
    assert_eq!(profile.attempts_since_adjustment, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn different_words_and_users_progress_independently() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let manager = Arc::new(LearningManager::new(LearningConfig::default(), store.clone()).unwrap());

    let mut handles = Vec::new();
    for user in ["u1", "u2"] {
        for word in ["a", "b", "c"] {
            for _ in 0..5 {
                let manager = manager.clone();
                handles.push(tokio::spawn(async move {
                    manager
                        .record_attempt(user, LearningAttempt::new(word, true, 2.0))
                        .await
                }));
            }
        }
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for user in ["u1", "u2"] {
        let mastery = store.list_user_mastery(user).unwrap();
        assert_eq!(mastery.len(), 3);
        for record in mastery.values() {
            assert_eq!(record.total_attempts, 5);
            assert!((record.mastery_level - 0.5).abs() < 1e-9);
        }
    }
}

#[tokio::test]
async fn failed_commit_leaves_no_trace() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let repo = Arc::new(FlakyRepo::new(store.clone()));
    let manager = LearningManager::new(LearningConfig::default(), repo.clone()).unwrap();

    manager
        .record_attempt("u1", LearningAttempt::new("apple", true, 2.0))
        .await
        .unwrap();
    let before = store.get_mastery("u1", "apple").unwrap().unwrap();

    repo.fail_commit.store(true, Ordering::SeqCst);
    let err = manager
        .record_attempt("u1", LearningAttempt::new("apple", false, 9.0))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LearningError::Persistence {
            scope: PersistenceScope::Mastery,
            ..
        }
    ));
    assert!(err.is_serious());
    assert_eq!(store.get_mastery("u1", "apple").unwrap().unwrap(), before);
    assert_eq!(store.recent_attempts("u1", 10).unwrap().len(), 1);

    let profile = manager.get_or_create_profile("u1").await.unwrap();
    assert_eq!(profile.attempts_since_adjustment, 1);
}

#[tokio::test]
async fn failed_profile_save_does_not_fail_the_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let repo = Arc::new(FlakyRepo::new(store.clone()));
    let manager = LearningManager::new(LearningConfig::default(), repo.clone()).unwrap();
    manager.get_or_create_profile("u1").await.unwrap();

    repo.fail_profile_save.store(true, Ordering::SeqCst);
    let outcome = manager
        .record_attempt("u1", LearningAttempt::new("apple", true, 2.0))
        .await
        .unwrap();

    assert!(!outcome.profile_persisted);
    assert_eq!(outcome.events.len(), 1);
    assert_eq!(store.get_mastery("u1", "apple").unwrap().unwrap().total_attempts, 1);

    let err = manager
        .update_profile("u1", Default::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LearningError::Persistence {
            scope: PersistenceScope::Profile,
            ..
        }
    ));
    assert!(!err.is_serious());
}

#[tokio::test]
async fn records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = open_store(&dir);
        let manager = LearningManager::new(LearningConfig::default(), store.clone()).unwrap();
        for _ in 0..3 {
            manager
                .record_attempt("u1", LearningAttempt::new("apple", true, 2.0))
                .await
                .unwrap();
        }
        store.flush().unwrap();
    }

    let store = open_store(&dir);
    let manager = LearningManager::new(LearningConfig::default(), store).unwrap();
    let record = manager.get_mastery("u1", "apple").await.unwrap();
    assert_eq!(record.total_attempts, 3);

    let analytics = manager.analytics("u1").await.unwrap();
    assert_eq!(analytics.total_words_studied, 1);
    assert_eq!(analytics.recent_attempts_count, 3);
    assert_eq!(analytics.learning_streak_days, 1);
}

#[tokio::test]
async fn selection_reflects_recorded_mastery() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let manager = LearningManager::new(LearningConfig::default(), store).unwrap();

    // "strong" 获得较高掌握度，"weak" 答错一次
    for _ in 0..5 {
        manager
            .record_attempt("u1", LearningAttempt::new("strong", true, 2.0))
            .await
            .unwrap();
    }
    manager
        .record_attempt("u1", LearningAttempt::new("weak", false, 2.0))
        .await
        .unwrap();

    let words: Vec<String> = ["fresh", "strong", "weak"].iter().map(|s| s.to_string()).collect();
    let outcome = manager.select_words("u1", &words, Some(2)).await.unwrap();

    assert_eq!(outcome.selection.words.len(), 2);
    assert!(outcome.selection.words.contains(&"weak".to_string()));
    assert!(!outcome.selection.words.contains(&"strong".to_string()));
}
