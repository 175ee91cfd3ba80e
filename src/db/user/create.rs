use super::{USER_COLUMNS, UserRepository};
use crate::errors::AppError;
use crate::models::User;

impl UserRepository {
    /// Resolve a user by transport handle, creating the row on first contact.
    /// Every hit refreshes `last_activity_at`.
    pub async fn get_or_create_by_handle(
        &self,
        handle: &str,
        display_name: Option<&str>,
    ) -> Result<User, AppError> {
        if handle.is_empty() {
            return Err(AppError::Validation("empty user handle".to_string()));
        }

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (handle, display_name)
             VALUES ($1, $2)
             ON CONFLICT (handle) DO UPDATE
               SET last_activity_at = now(),
                   display_name = COALESCE(users.display_name, EXCLUDED.display_name)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(handle)
        .bind(display_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }
}
