// src/handlers/community.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    error::AppError,
    extractors::ValidatedJson,
    handlers::{find_member, parse_id},
    models::post::{CreatePostRequest, Post, PostListParams},
    utils::{html::clean_html, jwt::Claims},
};

const POST_SELECT: &str = r#"
    SELECT
        p.id, p.user_id, u.username, p.title, p.content,
        p.created_at, p.updated_at, p.comments_count
    FROM posts p
    JOIN users u ON u.id = p.user_id
"#;

/// Create a new post.
/// Requires: Login.
pub async fn create_post(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(payload): ValidatedJson<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    find_member(&pool, user_id).await?;

    let content = clean_html(&payload.content);
    if content.trim().is_empty() {
        return Err(AppError::BadRequest("Content is empty after sanitizing".to_string()));
    }

    let post_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO posts (user_id, title, content, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(payload.title.trim())
    .bind(content)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create post: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!(post_id, user_id, "Post created");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "success": true, "id": post_id })),
    ))
}

/// List posts (Recent first).
/// Filter out soft-deleted posts.
/// Supports cursor-based pagination.
pub async fn list_posts(
    State(pool): State<SqlitePool>,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);

    let mut query = QueryBuilder::<Sqlite>::new(POST_SELECT);
    query.push(" WHERE p.deleted_at IS NULL");
    match (params.cursor, params.cursor_id) {
        (Some(cursor), Some(cursor_id)) => {
            // Posts sharing the cursor's timestamp are split by id
            query
                .push(" AND (p.created_at < ")
                .push_bind(cursor)
                .push(" OR (p.created_at = ")
                .push_bind(cursor)
                .push(" AND p.id < ")
                .push_bind(cursor_id)
                .push("))");
        }
        (Some(cursor), None) => {
            query.push(" AND p.created_at < ").push_bind(cursor);
        }
        (None, _) => {}
    }
    query
        .push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
        .push_bind(limit);

    let posts = query
        .build_query_as::<Post>()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list posts: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(posts))
}

/// Get a single post by ID.
pub async fn get_post(
    State(pool): State<SqlitePool>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&raw_id, "post")?;

    let post = sqlx::query_as::<_, Post>(&format!(
        "{} WHERE p.id = ? AND p.deleted_at IS NULL",
        POST_SELECT
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Post not found".to_string()))?;

    Ok(Json(post))
}

/// Delete a post (Soft Delete).
/// Requires: Login + (Author OR Admin).
pub async fn delete_post(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&raw_id, "post")?;
    let user_id = claims.user_id()?;

    let owner = sqlx::query_scalar::<_, i64>(
        "SELECT user_id FROM posts WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Post not found".to_string()))?;

    if owner != user_id && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "You are not authorized to delete this post".to_string(),
        ));
    }

    sqlx::query("UPDATE posts SET deleted_at = ? WHERE id = ?")
        .bind(chrono::Utc::now())
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete post: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(StatusCode::NO_CONTENT)
}
