pub mod keys;
pub mod migrate;
pub mod operations;
pub mod trees;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use thiserror::Error;

/// sled-backed mastery store: profiles, mastery records, attempt history.
#[derive(Debug)]
pub struct Store {
    db: Db,
    pub learning_profiles: sled::Tree,
    pub word_mastery: sled::Tree,
    pub word_mastery_archive: sled::Tree,
    pub learning_attempts: sled::Tree,
    // Secondary index trees
    pub mastery_due_index: sled::Tree,
    pub meta: sled::Tree,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found: entity={entity}, key={key}")]
    NotFound { entity: String, key: String },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("migration error at version {version}: {message}")]
    Migration { version: u32, message: String },
}

pub(crate) fn map_tx_error(error: sled::transaction::TransactionError<StoreError>) -> StoreError {
    match error {
        sled::transaction::TransactionError::Abort(store_error) => store_error,
        sled::transaction::TransactionError::Storage(storage_error) => {
            StoreError::Sled(storage_error)
        }
    }
}

pub(crate) fn abort(error: StoreError) -> sled::transaction::ConflictableTransactionError<StoreError> {
    sled::transaction::ConflictableTransactionError::Abort(error)
}

impl Store {
    pub fn open(sled_path: &str) -> Result<Self, StoreError> {
        let db = sled::open(sled_path)?;
        Self::from_db(db)
    }

    /// In-memory store that disappears on drop.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self, StoreError> {
        let learning_profiles = db.open_tree(trees::LEARNING_PROFILES)?;
        let word_mastery = db.open_tree(trees::WORD_MASTERY)?;
        let word_mastery_archive = db.open_tree(trees::WORD_MASTERY_ARCHIVE)?;
        let learning_attempts = db.open_tree(trees::LEARNING_ATTEMPTS)?;
        let mastery_due_index = db.open_tree(trees::MASTERY_DUE_INDEX)?;
        let meta = db.open_tree(trees::META)?;

        Ok(Self {
            db,
            learning_profiles,
            word_mastery,
            word_mastery_archive,
            learning_attempts,
            mastery_due_index,
            meta,
        })
    }

    pub fn run_migrations(&self) -> Result<(), StoreError> {
        migrate::run(self)
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    pub(crate) fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
