// Admin HTTP surface: operator endpoints for scheduling games, importing
// questions, registering players, and ending games. A collaborator of the
// engine, not part of the gameplay path.

pub mod handlers;
pub mod routes;

use axum::Router;

use crate::state::AppState;

pub fn create_http_routes(state: AppState) -> Router {
    routes::api_routes(state)
}
