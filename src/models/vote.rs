// src/models/vote.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents one row of the 'comment_votes' table.
/// A member holds at most one vote per comment.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct VoteRecord {
    pub comment_id: i64,
    pub user_id: i64,
    /// +1 or -1.
    pub value: i64,
}

/// DTO for casting a vote. `0` withdraws the caller's vote.
#[derive(Debug, Deserialize, Validate)]
pub struct VoteRequest {
    #[validate(range(min = -1, max = 1, message = "Vote must be -1, 0 or 1"))]
    pub value: i64,
}

/// DTO returned after a vote changes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub success: bool,
    pub sum_vote: i64,
    pub current_vote: Option<i64>,
}
