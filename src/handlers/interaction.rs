// src/handlers/interaction.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    db::begin_write,
    error::AppError,
    extractors::ValidatedJson,
    handlers::{comments::load_votes, find_member, parse_id},
    models::vote::{VoteRequest, VoteResponse},
    tree::VoteTally,
    utils::jwt::Claims,
};

/// Cast, change or withdraw a vote on a comment.
/// `value` is +1 or -1 to vote, 0 to withdraw.
pub async fn vote_comment(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(raw_id): Path<String>,
    ValidatedJson(payload): ValidatedJson<VoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let comment_id = parse_id(&raw_id, "comment")?;
    let user_id = claims.user_id()?;

    let mut tx = begin_write(&pool).await?;

    find_member(&mut *tx, user_id).await?;

    // 1. Comment must still be live
    sqlx::query_scalar::<_, i64>("SELECT id FROM comments WHERE id = ? AND deleted_at IS NULL")
        .bind(comment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    // 2. One vote per member: replace or remove it
    if payload.value == 0 {
        sqlx::query("DELETE FROM comment_votes WHERE comment_id = ? AND user_id = ?")
            .bind(comment_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    } else {
        sqlx::query(
            r#"
            INSERT INTO comment_votes (comment_id, user_id, value, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (comment_id, user_id) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(comment_id)
        .bind(user_id)
        .bind(payload.value)
        .bind(chrono::Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to record vote: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;
    }

    // 3. Fresh score for the response
    let votes = load_votes(&mut *tx, &[comment_id]).await?;
    let tally = VoteTally::tally(votes.get(&comment_id).into_iter().flatten(), Some(user_id));

    tx.commit().await?;

    tracing::debug!(
        comment_id,
        user_id,
        value = payload.value,
        sum = tally.sum_vote,
        "Vote recorded"
    );

    Ok(Json(VoteResponse {
        success: true,
        sum_vote: tally.sum_vote,
        current_vote: tally.current_vote,
    }))
}
