use crate::constants::KEY_SEPARATOR;
use crate::store::StoreError;

fn check_component(kind: &str, value: &str) -> Result<(), StoreError> {
    if value.is_empty() {
        return Err(StoreError::Validation(format!("{kind} must not be empty")));
    }
    if value.contains(KEY_SEPARATOR) {
        return Err(StoreError::Validation(format!(
            "{kind} must not contain '{KEY_SEPARATOR}'"
        )));
    }
    Ok(())
}

fn reverse_ts(timestamp_ms: i64) -> u64 {
    u64::MAX - timestamp_ms.max(0) as u64
}

pub fn profile_key(user_id: &str) -> Result<String, StoreError> {
    check_component("user_id", user_id)?;
    Ok(user_id.to_string())
}

pub fn mastery_key(user_id: &str, word: &str) -> Result<String, StoreError> {
    check_component("user_id", user_id)?;
    check_component("word", word)?;
    Ok(format!("{}:{}", user_id, word))
}

pub fn user_prefix(user_id: &str) -> Result<String, StoreError> {
    check_component("user_id", user_id)?;
    Ok(format!("{}:", user_id))
}

/// Archive entries keep every retired copy of a record.
pub fn mastery_archive_key(
    user_id: &str,
    word: &str,
    archived_at_ms: i64,
) -> Result<String, StoreError> {
    check_component("user_id", user_id)?;
    check_component("word", word)?;
    Ok(format!(
        "{}:{}:{:020}",
        user_id,
        word,
        archived_at_ms.max(0) as u64
    ))
}

/// Newest attempts sort first within a user's prefix.
pub fn attempt_key(user_id: &str, timestamp_ms: i64, attempt_id: &str) -> Result<String, StoreError> {
    check_component("user_id", user_id)?;
    check_component("attempt_id", attempt_id)?;
    Ok(format!(
        "{}:{:020}:{}",
        user_id,
        reverse_ts(timestamp_ms),
        attempt_id
    ))
}

/// Oldest-due first within a user's prefix.
pub fn due_index_key(user_id: &str, due_ts_ms: i64, word: &str) -> Result<String, StoreError> {
    check_component("user_id", user_id)?;
    check_component("word", word)?;
    Ok(format!(
        "{}:{:020}:{}",
        user_id,
        due_ts_ms.max(0) as u64,
        word
    ))
}

/// Splits a due-index key (without the user prefix check) into `(due_ts_ms, word)`.
pub fn parse_due_index_key(raw: &[u8]) -> Option<(i64, String)> {
    let text = std::str::from_utf8(raw).ok()?;
    let mut parts = text.splitn(3, KEY_SEPARATOR);
    let _user = parts.next()?;
    let ts = parts.next()?.parse::<u64>().ok()?;
    let word = parts.next()?;
    Some((i64::try_from(ts).ok()?, word.to_string()))
}
