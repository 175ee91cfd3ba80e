use super::UserRepository;
use crate::errors::AppError;

impl UserRepository {
    /// Record that a recipient could not be delivered to; the outbound queue
    /// calls this on permanent transport rejection.
    pub async fn mark_undeliverable(&self, handle: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET active = FALSE WHERE handle = $1")
            .bind(handle)
            .execute(&self.pool)
            .await?;
        tracing::warn!(%handle, "marked user undeliverable");
        Ok(())
    }
}
