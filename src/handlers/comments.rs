// src/handlers/comments.rs

use std::{collections::HashMap, sync::LazyLock};

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use regex::Regex;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool, types::Json as SqlJson};

use crate::{
    config::Config,
    db::begin_write,
    error::AppError,
    extractors::ValidatedJson,
    handlers::{ensure_post, find_member, parse_id},
    models::{
        comment::{
            CommentListParams, CommentListResponse, CommentResponse, CommentRow, CommentView,
            CreateCommentRequest, UpdateCommentRequest,
        },
        vote::VoteRecord,
    },
    tree::{DepthWindow, ParentRef, VoteTally, assign_path, build_forest, select_window},
    utils::{
        client::ClientHints,
        index_id::next_index_id,
        jwt::{Claims, MaybeClaims},
    },
};

/// Fresh tokens to try when an index id collides inside a post.
const MAX_INDEX_ATTEMPTS: usize = 3;

static PATH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-z]+(\.[0-9a-z]+)*$").expect("path pattern is valid"));

const COMMENT_SELECT: &str = r#"
    SELECT
        c.id, c.post_id, c.user_id, u.username, c.parent_id,
        c.index_id, c.path, c.depth, c.content, c.created_at, c.updated_at
    FROM comments c
    JOIN users u ON u.id = c.user_id
"#;

/// Read a post's comment thread as a nested reply forest.
///
/// `?path=` narrows the read to one subtree. The depth cap comes from the
/// client hints: mobile clients get a shallower window.
pub async fn list_comments(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    MaybeClaims(claims): MaybeClaims,
    hints: ClientHints,
    Path(raw_post_id): Path<String>,
    Query(params): Query<CommentListParams>,
) -> Result<impl IntoResponse, AppError> {
    let post_id = parse_id(&raw_post_id, "post")?;

    let root = params.path.as_deref().map(str::trim).filter(|p| !p.is_empty());
    if let Some(root) = root {
        if !PATH_PATTERN.is_match(root) {
            return Err(AppError::BadRequest("Invalid comment path".to_string()));
        }
    }

    ensure_post(&pool, post_id).await?;

    let viewer = claims.and_then(|c| c.user_id().ok());
    let window = select_window(root, config.comment_depth(hints.is_mobile));

    let mut rows = fetch_window(&pool, post_id, &window).await?;
    rows.retain(|row| window.contains(&row.path, row.depth));

    let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
    let votes = load_votes(&pool, &ids).await?;

    let views: Vec<CommentView> = rows
        .into_iter()
        .map(|row| {
            let tally = VoteTally::tally(votes.get(&row.id).into_iter().flatten(), viewer);
            CommentView::new(row, tally)
        })
        .collect();

    tracing::debug!(
        post_id,
        rows = views.len(),
        start_depth = window.base_depth(),
        limit_depth = window.limit_depth(),
        "Loaded comment window"
    );

    Ok(Json(CommentListResponse {
        success: true,
        comments: build_forest(views),
        is_mobile: hints.is_mobile,
        start_depth: window.base_depth(),
        limit_depth: window.limit_depth(),
    }))
}

/// Create a new comment or reply.
///
/// The parent must belong to the same post and must not be deleted.
/// Images embedded in the content stop being temporary uploads.
pub async fn create_comment(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(raw_post_id): Path<String>,
    ValidatedJson(payload): ValidatedJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let post_id = parse_id(&raw_post_id, "post")?;
    let user_id = claims.user_id()?;

    let mut tx = begin_write(&pool).await?;

    ensure_post(&mut *tx, post_id).await?;
    find_member(&mut *tx, user_id).await?;

    // 1. Resolve the parent's position in the thread
    let parent = match payload.parent_id {
        Some(parent_id) => Some(
            sqlx::query_as::<_, (String, i64)>(
                r#"
                SELECT path, depth FROM comments
                WHERE id = ? AND post_id = ? AND deleted_at IS NULL
                "#,
            )
            .bind(parent_id)
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("Parent comment not found".to_string()))?,
        ),
        None => None,
    };

    // 2. Embedded images become permanent
    let images = payload.content.image_sources();
    mark_uploads_permanent(&mut tx, &images).await?;

    // 3. Insert, retrying with a fresh token if the index id collides
    let mut attempt = 0;
    let comment_id = loop {
        attempt += 1;
        let index_id = next_index_id();
        let placement = assign_path(
            parent.as_ref().map(|(path, depth)| ParentRef {
                path,
                depth: *depth,
            }),
            &index_id,
        );

        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO comments
                (post_id, user_id, parent_id, index_id, path, depth, content, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .bind(payload.parent_id)
        .bind(&index_id)
        .bind(&placement.path)
        .bind(placement.depth)
        .bind(SqlJson(&payload.content))
        .bind(chrono::Utc::now())
        .fetch_one(&mut *tx)
        .await;

        match inserted {
            Ok(id) => break id,
            Err(e) => match insert_failure(e, attempt) {
                Some(err) => return Err(err),
                None => {
                    tracing::warn!(post_id, index_id = %index_id, "Index id collision, retrying")
                }
            },
        }
    };

    // 4. Update Post Count
    sqlx::query("UPDATE posts SET comments_count = comments_count + 1 WHERE id = ?")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(post_id, comment_id, user_id, images = images.len(), "Comment created");

    let row = fetch_comment(&pool, comment_id)
        .await?
        .ok_or_else(|| {
            AppError::InternalServerError(format!("Comment {} vanished after insert", comment_id))
        })?;

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            success: true,
            comment: CommentView::new(row, VoteTally::default()),
        }),
    ))
}

/// Replace a comment's content.
/// Requires: Login + Author.
pub async fn update_comment(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(raw_id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&raw_id, "comment")?;
    let user_id = claims.user_id()?;

    let mut tx = begin_write(&pool).await?;

    let owner = sqlx::query_scalar::<_, i64>(
        "SELECT user_id FROM comments WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    if owner != user_id {
        return Err(AppError::Forbidden(
            "You can only edit your own comments".to_string(),
        ));
    }

    mark_uploads_permanent(&mut tx, &payload.content.image_sources()).await?;

    sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ?")
        .bind(SqlJson(&payload.content))
        .bind(chrono::Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let row = fetch_comment(&pool, id)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;
    let votes = load_votes(&pool, &[id]).await?;
    let tally = VoteTally::tally(votes.get(&id).into_iter().flatten(), Some(user_id));

    Ok(Json(CommentResponse {
        success: true,
        comment: CommentView::new(row, tally),
    }))
}

/// Delete a comment (Soft Delete).
/// Requires: Login + (Author OR Admin).
///
/// Replies stay in place and are shown as top-level comments afterwards.
pub async fn delete_comment(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&raw_id, "comment")?;
    let user_id = claims.user_id()?;

    let mut tx = begin_write(&pool).await?;

    let (owner, post_id) = sqlx::query_as::<_, (i64, i64)>(
        "SELECT user_id, post_id FROM comments WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    if owner != user_id && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "You are not authorized to delete this comment".to_string(),
        ));
    }

    sqlx::query("UPDATE comments SET deleted_at = ? WHERE id = ?")
        .bind(chrono::Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE posts SET comments_count = MAX(0, comments_count - 1) WHERE id = ?")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(comment_id = id, post_id, user_id, "Comment deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Loads one live comment with its display relations.
pub(crate) async fn fetch_comment<'e, E>(
    executor: E,
    id: i64,
) -> Result<Option<CommentRow>, AppError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, CommentRow>(&format!(
        "{} WHERE c.id = ? AND c.deleted_at IS NULL",
        COMMENT_SELECT
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

/// Votes for the given comments, grouped by comment id.
pub(crate) async fn load_votes<'e, E>(
    executor: E,
    comment_ids: &[i64],
) -> Result<HashMap<i64, Vec<VoteRecord>>, AppError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let mut grouped: HashMap<i64, Vec<VoteRecord>> = HashMap::new();
    if comment_ids.is_empty() {
        return Ok(grouped);
    }

    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT comment_id, user_id, value FROM comment_votes WHERE comment_id IN (",
    );
    let mut separated = query.separated(", ");
    for id in comment_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let votes = query.build_query_as::<VoteRecord>().fetch_all(executor).await?;
    for vote in votes {
        grouped.entry(vote.comment_id).or_default().push(vote);
    }

    Ok(grouped)
}

/// Rows of a post inside the window's coarse bounds, ordered by path.
/// Callers refine with [`DepthWindow::contains`].
async fn fetch_window(
    pool: &SqlitePool,
    post_id: i64,
    window: &DepthWindow,
) -> Result<Vec<CommentRow>, AppError> {
    let mut query = QueryBuilder::<Sqlite>::new(COMMENT_SELECT);
    query
        .push(" WHERE c.post_id = ")
        .push_bind(post_id)
        .push(" AND c.deleted_at IS NULL AND c.depth <= ")
        .push_bind(window.limit_depth());

    if let Some(root) = window.root() {
        query
            .push(" AND substr(c.path, 1, ")
            .push_bind(root.len() as i64)
            .push(") = ")
            .push_bind(root.to_string());
    }

    query.push(" ORDER BY c.path ASC");

    let rows = query.build_query_as::<CommentRow>().fetch_all(pool).await?;
    Ok(rows)
}

/// Detaches uploaded files referenced by a comment from the temporary-file sweep.
async fn mark_uploads_permanent(
    conn: &mut SqliteConnection,
    urls: &[String],
) -> Result<(), AppError> {
    if urls.is_empty() {
        return Ok(());
    }

    let mut query =
        QueryBuilder::<Sqlite>::new("UPDATE uploads SET is_temporary = 0 WHERE url IN (");
    let mut separated = query.separated(", ");
    for url in urls {
        separated.push_bind(url.as_str());
    }
    separated.push_unseparated(")");

    let result = query.build().execute(&mut *conn).await?;
    tracing::debug!(
        referenced = urls.len(),
        updated = result.rows_affected(),
        "Marked uploads permanent"
    );

    Ok(())
}

/// Decides the fate of a failed comment insert. `None` means retry with a
/// fresh index id; collisions that outlast the retries are a conflict.
fn insert_failure(err: sqlx::Error, attempt: usize) -> Option<AppError> {
    if !is_unique_violation(&err) {
        tracing::error!("Failed to create comment: {:?}", err);
        return Some(err.into());
    }
    if attempt < MAX_INDEX_ATTEMPTS {
        return None;
    }

    tracing::error!(attempt, "Index id kept colliding, giving up");
    Some(AppError::Conflict(
        "Could not place the comment, please retry".to_string(),
    ))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}
