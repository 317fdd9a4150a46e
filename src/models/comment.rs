// src/models/comment.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

use crate::{
    models::rich_text::{RichTextNode, validate_document},
    tree::{TreeNode, TreeRow, VoteTally},
};

/// A row of the 'comments' table joined with its author's username.
#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub username: String,
    pub parent_id: Option<i64>,
    pub index_id: String,
    /// Materialized path: ancestors' index ids joined with '.'.
    pub path: String,
    pub depth: i64,
    pub content: Json<RichTextNode>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for displaying a comment with author info and its score.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub username: String,
    pub parent_id: Option<i64>,
    pub index_id: String,
    pub path: String,
    pub depth: i64,
    pub content: RichTextNode,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(flatten)]
    pub votes: VoteTally,
}

impl CommentView {
    pub fn new(row: CommentRow, votes: VoteTally) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            author_id: row.user_id,
            username: row.username,
            parent_id: row.parent_id,
            index_id: row.index_id,
            path: row.path,
            depth: row.depth,
            content: row.content.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
            votes,
        }
    }
}

impl TreeRow for CommentView {
    fn id(&self) -> i64 {
        self.id
    }

    fn parent_id(&self) -> Option<i64> {
        self.parent_id
    }
}

/// DTO for creating a new comment.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    /// Optional: the ID of the comment being replied to.
    pub parent_id: Option<i64>,

    #[validate(custom(function = validate_document))]
    pub content: RichTextNode,
}

/// DTO for editing a comment's content.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(custom(function = validate_document))]
    pub content: RichTextNode,
}

/// Query parameters for reading a thread.
#[derive(Debug, Deserialize)]
pub struct CommentListParams {
    /// Materialized path of the subtree root; absent for the whole thread.
    pub path: Option<String>,
}

/// Response body for a thread read.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentListResponse {
    pub success: bool,
    pub comments: Vec<TreeNode<CommentView>>,
    pub is_mobile: bool,
    pub start_depth: i64,
    pub limit_depth: i64,
}

/// Response body for a single comment.
#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub success: bool,
    pub comment: CommentView,
}
