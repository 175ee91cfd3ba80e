use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::http::handlers::PageQuery;
use crate::models::{Game, GamePlayer};
use crate::state::AppState;

/// Request body for scheduling a game.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    pub start_at: DateTime<Utc>,
    pub prize_pool: f64,
}

pub async fn create_game(
    State(state): State<AppState>,
    Json(body): Json<CreateGameRequest>,
) -> Result<(StatusCode, Json<Game>), AppError> {
    let game = state.games.create(body.start_at, body.prize_pool).await?;
    Ok((StatusCode::CREATED, Json(game)))
}

pub async fn list_games(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<Game>>, AppError> {
    let (limit, offset) = page.clamp();
    let games = state.games.list(limit, offset).await?;
    Ok(Json(games))
}

pub async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Game>, AppError> {
    let game = state.games.get(id).await?;
    Ok(Json(game))
}

/// Per-player results for reporting and prize disputes.
pub async fn game_results(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<GamePlayer>>, AppError> {
    state.games.get(id).await?;
    let players = state.players.for_game(id).await?;
    Ok(Json(players))
}

/// Pull a scheduled game's start to now; the scheduler sweep picks it up
/// within one period.
pub async fn start_game(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.games.reschedule_now(id).await? {
        tracing::info!(game_id = %id, "game start pulled forward by admin");
        Ok(StatusCode::ACCEPTED)
    } else {
        Err(AppError::Validation(
            "only scheduled games can be started".to_string(),
        ))
    }
}

/// Emergency end: the engine honors it at the game actor's next poll.
pub async fn end_game(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.games.get(id).await?;
    state.engine.emergency_end(id).await?;
    tracing::warn!(game_id = %id, "emergency end requested by admin");
    Ok(StatusCode::ACCEPTED)
}
