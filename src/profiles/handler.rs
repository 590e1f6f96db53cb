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
    posts::{self, PostAuthor, PostResponse, Visibility},
    profiles::{
        FriendshipStatus, Profile, ProfilePageResponse, ProfileResponse, ProfileUser,
        UpdateProfile,
    },
    response::ApiResponse,
};

/// Helper struct for fetching a user together with their profile
#[derive(FromRow)]
struct UserProfileRow {
    id: Uuid,
    username: String,
    bio: String,
    location: String,
    job_title: String,
    portfolio_url: String,
    avatar_url: String,
}

/// Helper struct for fetching the profile owner's posts with counts
#[derive(FromRow)]
struct OwnPostRow {
    id: Uuid,
    message: String,
    visibility: Visibility,
    created_at: chrono::DateTime<chrono::Utc>,
    like_count: i64,
    comment_count: i64,
}

/// View a user's profile page
/// GET /api/profiles/:username
pub async fn get_profile(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let owner = sqlx::query_as::<_, UserProfileRow>(
        r#"
        SELECT u.id, u.username, p.bio, p.location, p.job_title,
               p.portfolio_url, p.avatar_url
        FROM users u
        JOIN profiles p ON p.user_id = u.id
        WHERE u.username = $1
        "#,
    )
    .bind(&username)
    .fetch_optional(&pool)
    .await
    .map_err(|_| AppError::InternalServerError)?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    let friend_ids = graph::friend_ids_of(&pool, claims.sub)
        .await
        .map_err(|_| AppError::InternalServerError)?;

    // Profile history runs oldest first, and only the posts the viewer may
    // read survive the filter.
    let rows = sqlx::query_as::<_, OwnPostRow>(
        r#"
        SELECT
            p.id, p.message, p.visibility, p.created_at,
            (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS like_count,
            (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count
        FROM posts p
        WHERE p.author_id = $1
        ORDER BY p.created_at ASC
        "#,
    )
    .bind(owner.id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch profile posts: {:?}", e);
        AppError::InternalServerError
    })?;

    let mut visible: Vec<PostResponse> = rows
        .into_iter()
        .filter(|row| row.visibility.readable_by(owner.id, claims.sub, &friend_ids))
        .map(|row| PostResponse {
            id: row.id,
            author: PostAuthor {
                id: owner.id,
                username: owner.username.clone(),
                avatar_url: owner.avatar_url.clone(),
            },
            message: row.message,
            visibility: row.visibility,
            like_count: row.like_count,
            comment_count: row.comment_count,
            liked_by_viewer: false,
            created_at: row.created_at,
        })
        .collect();

    posts::handler::annotate_liked(&pool, claims.sub, &mut visible)
        .await
        .map_err(|_| AppError::InternalServerError)?;

    let friendship = friendship_status(&pool, claims.sub, owner.id, &friend_ids)
        .await
        .map_err(|_| AppError::InternalServerError)?;

    Ok(ApiResponse::success(ProfilePageResponse {
        user: ProfileUser {
            id: owner.id,
            username: owner.username,
        },
        bio: owner.bio,
        location: owner.location,
        job_title: owner.job_title,
        portfolio_url: owner.portfolio_url,
        avatar_url: owner.avatar_url,
        posts: visible,
        friendship,
    }))
}

/// Update the authenticated user's own profile
/// PUT /api/profiles/me
pub async fn update_my_profile(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Json(payload): Json<UpdateProfile>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::UnprocessableEntity(e.to_string()))?;

    let profile = sqlx::query_as::<_, Profile>(
        r#"
        UPDATE profiles SET
            bio = COALESCE($1, bio),
            location = COALESCE($2, location),
            job_title = COALESCE($3, job_title),
            portfolio_url = COALESCE($4, portfolio_url),
            avatar_url = COALESCE($5, avatar_url),
            updated_at = NOW()
        WHERE user_id = $6
        RETURNING *
        "#,
    )
    .bind(&payload.bio)
    .bind(&payload.location)
    .bind(&payload.job_title)
    .bind(&payload.portfolio_url)
    .bind(&payload.avatar_url)
    .bind(claims.sub)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update profile: {:?}", e);
        AppError::InternalServerError
    })?;

    Ok(ApiResponse::success_with_message(
        "Profile updated!".to_string(),
        ProfileResponse::from(profile),
    ))
}

async fn friendship_status(
    pool: &PgPool,
    viewer_id: Uuid,
    owner_id: Uuid,
    viewer_friends: &std::collections::HashSet<Uuid>,
) -> Result<FriendshipStatus, sqlx::Error> {
    let outgoing_pending = pending_between(pool, viewer_id, owner_id).await?;
    let incoming_pending = pending_between(pool, owner_id, viewer_id).await?;

    Ok(FriendshipStatus {
        is_friend: viewer_friends.contains(&owner_id),
        outgoing_pending,
        incoming_pending,
    })
}

async fn pending_between(
    pool: &PgPool,
    sender_id: Uuid,
    receiver_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT 1 FROM friend_requests
        WHERE sender_id = $1 AND receiver_id = $2 AND status = 'pending'
        "#,
    )
    .bind(sender_id)
    .bind(receiver_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.is_some())
}
