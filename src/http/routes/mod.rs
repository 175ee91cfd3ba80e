use axum::Router;
use axum::extract::Request;
use axum::middleware::{Next, from_fn, from_fn_with_state};
use axum::routing::{get, post};

use crate::http::handlers::{game, question, user};
use crate::middleware::{admin_auth, ip_limiter, ip_rate_limit};
use crate::state::AppState;

/// Per-IP quota on the admin surface; operators script against it, but
/// nothing legitimate sustains more than a few requests per second.
const ADMIN_RATE_PER_MINUTE: u32 = 300;

/// Admin API routes, gated by the static credential header and rate-limited
/// per IP.
pub fn api_routes(state: AppState) -> Router {
    let limiter = ip_limiter(ADMIN_RATE_PER_MINUTE);
    Router::new()
        .route("/api/games", post(game::create_game).get(game::list_games))
        .route("/api/games/{id}", get(game::get_game))
        .route("/api/games/{id}/questions", post(question::add_questions))
        .route("/api/games/{id}/players", post(user::register_player))
        .route("/api/games/{id}/results", get(game::game_results))
        .route("/api/games/{id}/start", post(game::start_game))
        .route("/api/games/{id}/end", post(game::end_game))
        .route("/api/users", get(user::list_users))
        .layer(from_fn_with_state(state.clone(), admin_auth))
        .layer(from_fn(move |request: Request, next: Next| {
            let limiter = limiter.clone();
            async move { ip_rate_limit(limiter, request, next).await }
        }))
        .with_state(state)
}
