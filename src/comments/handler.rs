use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::jwt,
    comments::{Comment, CommentAuthor, CommentResponse, CreateComment},
    error::AppError,
    response::ApiResponse,
};

/// Helper struct for fetching comments with author info from database
#[derive(FromRow)]
struct CommentFromDb {
    id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    text: String,
    created_at: chrono::DateTime<chrono::Utc>,
    username: String,
    avatar_url: String,
}

impl From<CommentFromDb> for CommentResponse {
    fn from(c: CommentFromDb) -> Self {
        CommentResponse {
            id: c.id,
            post_id: c.post_id,
            author: CommentAuthor {
                id: c.author_id,
                username: c.username,
                avatar_url: c.avatar_url,
            },
            text: c.text,
            created_at: c.created_at,
        }
    }
}

/// Add a comment to a post
/// POST /api/posts/:id/comments
pub async fn add_comment(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CreateComment>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::UnprocessableEntity(e.to_string()))?;

    sqlx::query("SELECT id FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    let comment = sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (id, post_id, author_id, text, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(post_id)
    .bind(claims.sub)
    .bind(&payload.text)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create comment: {:?}", e);
        AppError::InternalServerError
    })?;

    get_comment_response(&pool, comment.id).await
}

/// Comments on a post, oldest first
/// GET /api/posts/:id/comments
pub async fn get_post_comments(
    State(pool): State<PgPool>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    sqlx::query("SELECT id FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    let comments = sqlx::query_as::<_, CommentFromDb>(
        r#"
        SELECT c.id, c.post_id, c.author_id, c.text, c.created_at,
               u.username, p.avatar_url
        FROM comments c
        JOIN users u ON c.author_id = u.id
        JOIN profiles p ON p.user_id = u.id
        WHERE c.post_id = $1
        ORDER BY c.created_at ASC
        "#,
    )
    .bind(post_id)
    .fetch_all(&pool)
    .await
    .map_err(|_| AppError::InternalServerError)?;

    let response: Vec<CommentResponse> =
        comments.into_iter().map(CommentResponse::from).collect();

    Ok(ApiResponse::success(response))
}

async fn get_comment_response(
    pool: &PgPool,
    comment_id: Uuid,
) -> Result<ApiResponse<CommentResponse>, AppError> {
    let row = sqlx::query_as::<_, CommentFromDb>(
        r#"
        SELECT c.id, c.post_id, c.author_id, c.text, c.created_at,
               u.username, p.avatar_url
        FROM comments c
        JOIN users u ON c.author_id = u.id
        JOIN profiles p ON p.user_id = u.id
        WHERE c.id = $1
        "#,
    )
    .bind(comment_id)
    .fetch_optional(pool)
    .await
    .map_err(|_| AppError::InternalServerError)?
    .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    Ok(ApiResponse::success(CommentResponse::from(row)))
}
