use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::http::handlers::PageQuery;
use crate::models::User;
use crate::state::AppState;

pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    let (limit, offset) = page.clamp();
    let users = state.users.list(limit, offset).await?;
    Ok(Json(users))
}

/// Request body for admin player registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPlayerRequest {
    pub handle: String,
    pub display_name: Option<String>,
}

/// Register a player into a game by transport handle, creating the user row
/// when this is their first contact.
pub async fn register_player(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
    Json(body): Json<RegisterPlayerRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = state
        .users
        .get_or_create_by_handle(&body.handle, body.display_name.as_deref())
        .await?;
    state.players.register(game_id, user.id).await?;
    tracing::info!(game_id = %game_id, user_id = %user.id, "player registered by admin");
    Ok((StatusCode::CREATED, Json(user)))
}
