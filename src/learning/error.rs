use std::fmt;

use thiserror::Error;

use crate::store::StoreError;

/// Which write was lost when persistence fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceScope {
    /// Mastery record (and its attempt row). The attempt did not take effect.
    Mastery,
    /// Attempt history read or archive move.
    Attempt,
    /// Profile bookkeeping. Cosmetic: learning state is intact.
    Profile,
}

impl fmt::Display for PersistenceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mastery => "mastery",
            Self::Attempt => "attempt",
            Self::Profile => "profile",
        })
    }
}

#[derive(Debug, Error)]
pub enum LearningError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: entity={entity}, key={key}")]
    NotFound { entity: String, key: String },
    #[error("{scope} persistence failed: {source}")]
    Persistence {
        scope: PersistenceScope,
        #[source]
        source: StoreError,
    },
}

impl LearningError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(entity: &str, key: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            key: key.to_string(),
        }
    }

    pub fn persistence(scope: PersistenceScope) -> impl FnOnce(StoreError) -> Self {
        move |source| match source {
            // Key validation happens in the store; surface it as caller input error.
            StoreError::Validation(message) => Self::Validation(message),
            source => Self::Persistence { scope, source },
        }
    }

    pub fn is_serious(&self) -> bool {
        matches!(
            self,
            Self::Persistence {
                scope: PersistenceScope::Mastery,
                ..
            }
        )
    }
}
