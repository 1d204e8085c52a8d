use chrono::Utc;

use crate::learning::types::LearningProfile;
use crate::store::keys;
use crate::store::{Store, StoreError};

impl Store {
    pub fn get_profile(&self, user_id: &str) -> Result<Option<LearningProfile>, StoreError> {
        let key = keys::profile_key(user_id)?;
        match self.learning_profiles.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Upserts the profile, stamping `updated_at`.
    pub fn save_profile(&self, profile: &LearningProfile) -> Result<(), StoreError> {
        let key = keys::profile_key(&profile.user_id)?;
        let mut stamped = profile.clone();
        stamped.updated_at = Utc::now();
        self.learning_profiles
            .insert(key.as_bytes(), Self::serialize(&stamped)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::learning::types::{LearningDifficulty, LearningProfile, LearningStyle};
    use crate::store::Store;

    #[test]
    fn profile_roundtrips_through_store() {
        let store = Store::temporary().unwrap();
        assert!(store.get_profile("u1").unwrap().is_none());

        let mut profile = LearningProfile::new("u1", Utc::now());
        profile.learning_style = LearningStyle::Visual;
        profile.preferred_difficulty = LearningDifficulty::Advanced;
        store.save_profile(&profile).unwrap();

        let loaded = store.get_profile("u1").unwrap().unwrap();
        assert_eq!(loaded.learning_style, LearningStyle::Visual);
        assert_eq!(loaded.preferred_difficulty, LearningDifficulty::Advanced);
        assert!(loaded.updated_at >= profile.updated_at);
    }

    #[test]
    fn profile_stores_tier_as_integer() {
        let store = Store::temporary().unwrap();
        store
            .save_profile(&LearningProfile::new("u1", Utc::now()))
            .unwrap();
        let raw = store.learning_profiles.get("u1").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(json["preferredDifficulty"], 3);
        assert_eq!(json["learningStyle"], "mixed");
    }
}
