use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::db::question::NewQuestion;
use crate::errors::AppError;
use crate::models::Question;
use crate::state::AppState;

/// Bulk question import for a scheduled game. Each entry carries the text,
/// its four options, and which option is correct.
pub async fn add_questions(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    Json(batch): Json<Vec<NewQuestion>>,
) -> Result<(StatusCode, Json<Vec<Question>>), AppError> {
    if batch.is_empty() {
        return Err(AppError::Validation("empty question batch".to_string()));
    }
    let default_limit = state.engine_config.question_time_limit.as_millis() as i64;
    let created = state
        .questions
        .add_batch(game_id, default_limit, &batch)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}
