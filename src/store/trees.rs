pub const LEARNING_PROFILES: &str = "learning_profiles";
pub const WORD_MASTERY: &str = "word_mastery";
pub const WORD_MASTERY_ARCHIVE: &str = "word_mastery_archive";
pub const LEARNING_ATTEMPTS: &str = "learning_attempts";

// Secondary index trees
pub const MASTERY_DUE_INDEX: &str = "mastery_due_index";

pub const META: &str = "meta";
