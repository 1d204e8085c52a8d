use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use crate::extractors::JsonBody;
use crate::learning::{LearningAttempt, ProfileUpdate};
use crate::response::{ok, AppError};
use crate::state::AppState;

/// Upper bound on words accepted by one selection or prediction request.
const MAX_BATCH_WORDS: usize = 2000;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:user_id/profile", get(get_profile).put(update_profile))
        .route("/:user_id/attempts", post(record_attempt))
        .route("/:user_id/difficulty/adjust", post(adjust_difficulty))
        .route("/:user_id/select", post(select_words))
        .route("/:user_id/due", get(due_words))
        .route("/:user_id/mastery/:word", get(get_mastery))
        .route(
            "/:user_id/mastery/:word/archive",
            get(archived_history).post(archive_word),
        )
        .route("/:user_id/predict", post(predict))
        .route("/:user_id/analytics", get(analytics))
}

fn check_batch(words: &[String]) -> Result<(), AppError> {
    if words.len() > MAX_BATCH_WORDS {
        return Err(AppError::bad_request(
            "BATCH_TOO_LARGE",
            &format!("at most {MAX_BATCH_WORDS} words per request"),
        ));
    }
    Ok(())
}

async fn get_profile(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let profile = state.manager().get_or_create_profile(&user_id).await?;
    Ok(ok(profile))
}

async fn update_profile(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let profile = state.manager().update_profile(&user_id, update).await?;
    Ok(ok(profile))
}

async fn record_attempt(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    JsonBody(attempt): JsonBody<LearningAttempt>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let outcome = state.manager().record_attempt(&user_id, attempt).await?;
    state.publish(&outcome.events);
    Ok(ok(outcome))
}

async fn adjust_difficulty(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let outcome = state.manager().adjust_difficulty(&user_id).await?;
    state.publish(&outcome.events);
    Ok(ok(outcome))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectRequest {
    available_words: Vec<String>,
    target_count: Option<usize>,
}

async fn select_words(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SelectRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    check_batch(&req.available_words)?;
    let outcome = state
        .manager()
        .select_words(&user_id, &req.available_words, req.target_count)
        .await?;
    state.publish(&outcome.events);
    Ok(ok(outcome))
}

#[derive(Debug, Deserialize)]
struct DueQuery {
    limit: Option<usize>,
}

async fn due_words(
    Path(user_id): Path<String>,
    Query(q): Query<DueQuery>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let limit = q.limit.map(|l| l.min(MAX_BATCH_WORDS));
    let records = state.manager().due_words(&user_id, limit).await?;
    Ok(ok(records))
}

async fn get_mastery(
    Path((user_id, word)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let record = state.manager().get_mastery(&user_id, &word).await?;
    Ok(ok(record))
}

async fn archive_word(
    Path((user_id, word)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let record = state.manager().archive_word(&user_id, &word).await?;
    Ok(ok(record))
}

async fn archived_history(
    Path((user_id, word)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let records = state.manager().archived_history(&user_id, &word).await?;
    Ok(ok(records))
}

#[derive(Debug, Deserialize)]
struct PredictRequest {
    words: Vec<String>,
}

async fn predict(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<PredictRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    check_batch(&req.words)?;
    let predictions = state.manager().predict(&user_id, &req.words).await?;
    Ok(ok(predictions))
}

async fn analytics(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let summary = state.manager().analytics(&user_id).await?;
    Ok(ok(summary))
}
