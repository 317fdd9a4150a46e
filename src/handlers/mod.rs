// src/handlers/mod.rs

use sqlx::Sqlite;

use crate::{error::AppError, models::user::User};

pub mod comments;
pub mod community;
pub mod interaction;

/// Parses a numeric path parameter, rejecting anything that is not a positive id.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<i64, AppError> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::BadRequest(format!("Invalid {} id", what))),
    }
}

/// Loads the member behind a token. Members are provisioned externally, so a
/// valid token for an unknown id is reported as not found.
pub(crate) async fn find_member<'e, E>(executor: E, user_id: i64) -> Result<User, AppError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, User>("SELECT id, username, role FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))
}

/// Fails with 404 unless the post exists and is not deleted.
pub(crate) async fn ensure_post<'e, E>(executor: E, post_id: i64) -> Result<(), AppError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar::<_, i64>("SELECT id FROM posts WHERE id = ? AND deleted_at IS NULL")
        .bind(post_id)
        .fetch_optional(executor)
        .await?
        .map(|_| ())
        .ok_or(AppError::NotFound("Post not found".to_string()))
}
