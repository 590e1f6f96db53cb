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
    friends::{
        graph, Decision, FriendRequest, FriendResponse, PendingRequestResponse, RequestSender,
        RequestStatus, RespondFriendRequest, SendFriendRequest, SendRequestOutcome,
    },
    response::ApiResponse,
};

/// Helper struct for fetching pending requests with sender info
#[derive(FromRow)]
struct PendingRequestRow {
    id: Uuid,
    sender_id: Uuid,
    username: String,
    avatar_url: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<PendingRequestRow> for PendingRequestResponse {
    fn from(r: PendingRequestRow) -> Self {
        PendingRequestResponse {
            id: r.id,
            sender: RequestSender {
                id: r.sender_id,
                username: r.username,
                avatar_url: r.avatar_url,
            },
            created_at: r.created_at,
        }
    }
}

/// Send a friend request to a user by username
/// POST /api/friends/requests
pub async fn send_friend_request(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Json(payload): Json<SendFriendRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::UnprocessableEntity(e.to_string()))?;

    let receiver_id: Uuid = sqlx::query_scalar("SELECT id FROM users WHERE username = $1")
        .bind(&payload.username)
        .fetch_optional(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    if receiver_id == claims.sub {
        return Ok(ApiResponse::success_with_message(
            "You cannot befriend yourself.".to_string(),
            SendRequestOutcome::SelfRequest,
        ));
    }

    // Checked before any row lookup so an already-connected pair never tries
    // to recreate a request.
    if graph::are_friends(&pool, claims.sub, receiver_id)
        .await
        .map_err(|_| AppError::InternalServerError)?
    {
        return Ok(ApiResponse::success_with_message(
            "You are already friends!".to_string(),
            SendRequestOutcome::AlreadyFriends,
        ));
    }

    // Mutual interest: if the target already has a pending request pointed at
    // us, accept it instead of creating a mirror row. The UPDATE is scoped to
    // pending, so it cannot touch a resolved request.
    let reverse = sqlx::query_as::<_, FriendRequest>(
        r#"
        UPDATE friend_requests SET status = 'accepted', responded_at = $1
        WHERE sender_id = $2 AND receiver_id = $3 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(chrono::Utc::now())
    .bind(receiver_id)
    .bind(claims.sub)
    .fetch_optional(&pool)
    .await
    .map_err(|_| AppError::InternalServerError)?;

    if reverse.is_some() {
        return Ok(ApiResponse::success_with_message(
            "They had already asked; you are now friends.".to_string(),
            SendRequestOutcome::MutualAccepted,
        ));
    }

    // Find-or-create on the (sender, receiver) unique key. A concurrent
    // duplicate submission loses the insert and falls through to the lookup.
    let created: Option<Uuid> = sqlx::query_scalar(
        r#"
        INSERT INTO friend_requests (id, sender_id, receiver_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (sender_id, receiver_id) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(claims.sub)
    .bind(receiver_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create friend request: {:?}", e);
        AppError::InternalServerError
    })?;

    if let Some(request_id) = created {
        return Ok(ApiResponse::success_with_message(
            "Friend request sent.".to_string(),
            SendRequestOutcome::Sent { request_id },
        ));
    }

    let status: RequestStatus = sqlx::query_scalar(
        "SELECT status FROM friend_requests WHERE sender_id = $1 AND receiver_id = $2",
    )
    .bind(claims.sub)
    .bind(receiver_id)
    .fetch_one(&pool)
    .await
    .map_err(|_| AppError::InternalServerError)?;

    if status.is_terminal() {
        Ok(ApiResponse::success_with_message(
            "Previous request handled; feel free to try again later.".to_string(),
            SendRequestOutcome::PreviouslyResolved,
        ))
    } else {
        Ok(ApiResponse::success_with_message(
            "Friend request already sent.".to_string(),
            SendRequestOutcome::AlreadyPending,
        ))
    }
}

/// Accept or decline a pending friend request
/// POST /api/friends/requests/:id
pub async fn respond_friend_request(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<RespondFriendRequest>,
) -> Result<impl IntoResponse, AppError> {
    let new_status = match payload.decision {
        Decision::Accept => RequestStatus::Accepted,
        Decision::Decline => RequestStatus::Declined,
    };

    // Status and responded_at are written together, scoped to pending, so a
    // second response can never clobber the original resolution.
    let updated = sqlx::query_as::<_, FriendRequest>(
        r#"
        UPDATE friend_requests SET status = $1, responded_at = $2
        WHERE id = $3 AND receiver_id = $4 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(new_status)
    .bind(chrono::Utc::now())
    .bind(request_id)
    .bind(claims.sub)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to respond to friend request: {:?}", e);
        AppError::InternalServerError
    })?;

    if let Some(request) = updated {
        let message = match payload.decision {
            Decision::Accept => "Friend request accepted.",
            Decision::Decline => "Friend request declined.",
        };
        return Ok(ApiResponse::success_with_message(
            message.to_string(),
            request,
        ));
    }

    // The guarded UPDATE missed; figure out why.
    let existing =
        sqlx::query_as::<_, FriendRequest>("SELECT * FROM friend_requests WHERE id = $1")
            .bind(request_id)
            .fetch_optional(&pool)
            .await
            .map_err(|_| AppError::InternalServerError)?
            .ok_or(AppError::NotFound("Friend request not found".to_string()))?;

    if existing.receiver_id != claims.sub {
        Err(AppError::Forbidden(
            "Only the receiver can respond to this request".to_string(),
        ))
    } else {
        Err(AppError::Conflict(
            "Friend request has already been responded to".to_string(),
        ))
    }
}

/// Incoming pending requests for the authenticated user
/// GET /api/friends/requests
pub async fn get_pending_requests(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, PendingRequestRow>(
        r#"
        SELECT fr.id, fr.sender_id, u.username, p.avatar_url, fr.created_at
        FROM friend_requests fr
        JOIN users u ON fr.sender_id = u.id
        JOIN profiles p ON p.user_id = u.id
        WHERE fr.receiver_id = $1 AND fr.status = 'pending'
        ORDER BY fr.created_at DESC
        "#,
    )
    .bind(claims.sub)
    .fetch_all(&pool)
    .await
    .map_err(|_| AppError::InternalServerError)?;

    let requests: Vec<PendingRequestResponse> = rows
        .into_iter()
        .map(PendingRequestResponse::from)
        .collect();

    Ok(ApiResponse::success(requests))
}

/// Friend list for the authenticated user
/// GET /api/friends
pub async fn get_friends(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
) -> Result<impl IntoResponse, AppError> {
    let friend_ids = graph::friend_ids_of(&pool, claims.sub)
        .await
        .map_err(|_| AppError::InternalServerError)?;

    if friend_ids.is_empty() {
        return Ok(ApiResponse::success(Vec::<FriendResponse>::new()));
    }

    let ids: Vec<Uuid> = friend_ids.into_iter().collect();

    let friends = sqlx::query_as::<_, FriendResponse>(
        r#"
        SELECT u.id, u.username, p.avatar_url, p.job_title
        FROM users u
        JOIN profiles p ON p.user_id = u.id
        WHERE u.id = ANY($1)
        ORDER BY u.username ASC
        "#,
    )
    .bind(&ids)
    .fetch_all(&pool)
    .await
    .map_err(|_| AppError::InternalServerError)?;

    Ok(ApiResponse::success(friends))
}
