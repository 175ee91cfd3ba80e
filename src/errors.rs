use axum::http::StatusCode;
use redis::RedisError;
use thiserror::Error;

/// Application-wide error type.
///
/// Domain signalling (duplicate answers, eliminated players) is expressed as
/// result variants on the engine and store APIs, not as errors. These
/// variants cover genuine failures and request rejection.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Transient transport error: {0}")]
    TransportTransient(String),

    #[error("Permanent transport error: {0}")]
    TransportPermanent(String),

    #[error("Answer store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Redis command error: {0}")]
    RedisCommandError(#[from] RedisError),

    #[error("Database unavailable: {0}")]
    DatabaseUnavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Circuit open for service '{0}'")]
    CircuitOpen(&'static str),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Env error: {0}")]
    EnvError(String),

    #[error("Internal server error")]
    InternalError,
}

impl AppError {
    pub fn to_response(&self) -> (StatusCode, String) {
        match self {
            AppError::TransportTransient(e) => (StatusCode::BAD_GATEWAY, e.clone()),
            AppError::TransportPermanent(e) => (StatusCode::BAD_GATEWAY, e.clone()),
            AppError::StoreUnavailable(e) => (StatusCode::SERVICE_UNAVAILABLE, e.clone()),
            AppError::RedisCommandError(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            AppError::DatabaseUnavailable(e) => (StatusCode::SERVICE_UNAVAILABLE, e.clone()),
            AppError::Serialization(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Duplicate(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg.clone()),
            AppError::CircuitOpen(service) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Service '{service}' temporarily unavailable"),
            ),
            AppError::Cancelled(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::EnvError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unexpected server error".into(),
            ),
        }
    }

    /// Whether a retry at the same layer can reasonably succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::TransportTransient(_)
                | AppError::StoreUnavailable(_)
                | AppError::DatabaseUnavailable(_)
                | AppError::Timeout(_)
                | AppError::RedisCommandError(_)
        )
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".to_string()),
            other => AppError::DatabaseUnavailable(other.to_string()),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = self.to_response();
        (status, body).into_response()
    }
}
