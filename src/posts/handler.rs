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
    error::AppError,
    friends::graph,
    posts::{CreatePost, LikeStateResponse, Post, PostAuthor, PostResponse},
    response::ApiResponse,
};

/// Helper struct for fetching posts with author info and counts
#[derive(FromRow)]
struct PostFromDb {
    id: Uuid,
    author_id: Uuid,
    message: String,
    visibility: crate::posts::Visibility,
    created_at: chrono::DateTime<chrono::Utc>,
    username: String,
    avatar_url: String,
    like_count: i64,
    comment_count: i64,
}

impl From<PostFromDb> for PostResponse {
    fn from(p: PostFromDb) -> Self {
        PostResponse {
            id: p.id,
            author: PostAuthor {
                id: p.author_id,
                username: p.username,
                avatar_url: p.avatar_url,
            },
            message: p.message,
            visibility: p.visibility,
            like_count: p.like_count,
            comment_count: p.comment_count,
            liked_by_viewer: false,
            created_at: p.created_at,
        }
    }
}

/// Create a new post
/// POST /api/posts
pub async fn create_post(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Json(payload): Json<CreatePost>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::UnprocessableEntity(e.to_string()))?;

    let post = sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (id, author_id, message, visibility, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(claims.sub)
    .bind(&payload.message)
    .bind(payload.visibility)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create post: {:?}", e);
        AppError::InternalServerError
    })?;

    let row = sqlx::query_as::<_, (String, String)>(
        r#"
        SELECT u.username, p.avatar_url FROM users u
        JOIN profiles p ON p.user_id = u.id
        WHERE u.id = $1
        "#,
    )
    .bind(claims.sub)
    .fetch_one(&pool)
    .await
    .map_err(|_| AppError::InternalServerError)?;

    let (username, avatar_url) = row;

    Ok(ApiResponse::success(PostResponse {
        id: post.id,
        author: PostAuthor {
            id: post.author_id,
            username,
            avatar_url,
        },
        message: post.message,
        visibility: post.visibility,
        like_count: 0,
        comment_count: 0,
        liked_by_viewer: false,
        created_at: post.created_at,
    })
    .created())
}

/// The feed: posts visible to the viewer, newest first
/// GET /api/feed
pub async fn get_feed(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
) -> Result<impl IntoResponse, AppError> {
    let friend_ids: Vec<Uuid> = graph::friend_ids_of(&pool, claims.sub)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .into_iter()
        .collect();

    // Inclusion must agree with Visibility::readable_by: public posts, own
    // posts, and friends-only posts from the viewer's friend set.
    let rows = sqlx::query_as::<_, PostFromDb>(
        r#"
        SELECT
            p.id, p.author_id, p.message, p.visibility, p.created_at,
            u.username, pr.avatar_url,
            (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS like_count,
            (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count
        FROM posts p
        JOIN users u ON p.author_id = u.id
        JOIN profiles pr ON pr.user_id = u.id
        WHERE p.visibility = 'public'
           OR p.author_id = $1
           OR (p.visibility = 'friends' AND p.author_id = ANY($2))
        ORDER BY p.created_at DESC
        "#,
    )
    .bind(claims.sub)
    .bind(&friend_ids)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Feed error: {:?}", e);
        AppError::InternalServerError
    })?;

    let mut posts: Vec<PostResponse> = rows.into_iter().map(PostResponse::from).collect();
    annotate_liked(&pool, claims.sub, &mut posts)
        .await
        .map_err(|_| AppError::InternalServerError)?;

    Ok(ApiResponse::success(posts))
}

/// Toggle a like on a post
/// POST /api/posts/:id/like
pub async fn toggle_like(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    sqlx::query("SELECT id FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    // The (user, post) primary key arbitrates the toggle: if the insert is a
    // no-op the like already existed (possibly from a concurrent double
    // click) and gets removed instead.
    let inserted = sqlx::query(
        r#"
        INSERT INTO likes (user_id, post_id) VALUES ($1, $2)
        ON CONFLICT (user_id, post_id) DO NOTHING
        "#,
    )
    .bind(claims.sub)
    .bind(post_id)
    .execute(&pool)
    .await
    .map_err(|_| AppError::InternalServerError)?
    .rows_affected();

    let liked = if inserted == 1 {
        true
    } else {
        sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(claims.sub)
            .bind(post_id)
            .execute(&pool)
            .await
            .map_err(|_| AppError::InternalServerError)?;
        false
    };

    let like_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?;

    Ok(ApiResponse::success(LikeStateResponse {
        post_id,
        liked,
        like_count,
    }))
}

/// Sets `liked_by_viewer` across a batch of posts with a single membership
/// query, whatever the batch size.
pub(crate) async fn annotate_liked(
    pool: &PgPool,
    viewer_id: Uuid,
    posts: &mut [PostResponse],
) -> Result<(), sqlx::Error> {
    if posts.is_empty() {
        return Ok(());
    }

    let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();

    let liked_ids: Vec<Uuid> = sqlx::query_scalar(
        "SELECT post_id FROM likes WHERE user_id = $1 AND post_id = ANY($2)",
    )
    .bind(viewer_id)
    .bind(&post_ids)
    .fetch_all(pool)
    .await?;

    for post in posts.iter_mut() {
        post.liked_by_viewer = liked_ids.contains(&post.id);
    }

    Ok(())
}
