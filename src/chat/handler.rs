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
    chat::{
        ordered_pair, ChatThreadResponse, ChatUser, Conversation, ConversationInfo, Message,
        MessageResponse, SendChatMessage,
    },
    error::AppError,
    friends::graph,
    response::ApiResponse,
};

/// Helper struct for resolving a chat partner by username
#[derive(FromRow)]
struct PartnerRow {
    id: Uuid,
    username: String,
    avatar_url: String,
}

/// Helper struct for fetching messages with sender info
#[derive(FromRow)]
struct MessageFromDb {
    id: Uuid,
    sender_id: Uuid,
    body: String,
    created_at: chrono::DateTime<chrono::Utc>,
    username: String,
    avatar_url: String,
}

impl From<MessageFromDb> for MessageResponse {
    fn from(m: MessageFromDb) -> Self {
        MessageResponse {
            id: m.id,
            sender: ChatUser {
                id: m.sender_id,
                username: m.username,
                avatar_url: m.avatar_url,
            },
            body: m.body,
            created_at: m.created_at,
        }
    }
}

/// Helper struct for the conversation list with the other participant
#[derive(FromRow)]
struct ConversationRow {
    id: Uuid,
    created_at: chrono::DateTime<chrono::Utc>,
    other_id: Uuid,
    other_username: String,
    other_avatar_url: String,
}

impl From<ConversationRow> for ConversationInfo {
    fn from(c: ConversationRow) -> Self {
        ConversationInfo {
            id: c.id,
            other: ChatUser {
                id: c.other_id,
                username: c.other_username,
                avatar_url: c.other_avatar_url,
            },
            created_at: c.created_at,
        }
    }
}

enum ChatPartner {
    Friend(PartnerRow),
    SelfChat,
    NotFriends(String),
}

/// Open (or lazily create) the chat thread with a friend
/// GET /api/chat/:username
pub async fn open_thread(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let partner = match validate_chat_partner(&pool, claims.sub, &username).await? {
        ChatPartner::SelfChat => {
            return Ok(ApiResponse::success_with_message(
                "Messaging yourself is not supported.".to_string(),
                ChatThreadResponse::SelfChat,
            ))
        }
        ChatPartner::NotFriends(username) => {
            return Ok(ApiResponse::success_with_message(
                "You can only chat with accepted connections.".to_string(),
                ChatThreadResponse::NotFriends { username },
            ))
        }
        ChatPartner::Friend(partner) => partner,
    };

    let (conversation, _) = conversation_between(&pool, claims.sub, partner.id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to resolve conversation: {:?}", e);
            AppError::InternalServerError
        })?;

    let messages = sqlx::query_as::<_, MessageFromDb>(
        r#"
        SELECT m.id, m.sender_id, m.body, m.created_at,
               u.username, p.avatar_url
        FROM messages m
        JOIN users u ON m.sender_id = u.id
        JOIN profiles p ON p.user_id = u.id
        WHERE m.conversation_id = $1
        ORDER BY m.created_at ASC
        "#,
    )
    .bind(conversation.id)
    .fetch_all(&pool)
    .await
    .map_err(|_| AppError::InternalServerError)?;

    Ok(ApiResponse::success(ChatThreadResponse::Open {
        conversation: ConversationInfo {
            id: conversation.id,
            other: ChatUser {
                id: partner.id,
                username: partner.username,
                avatar_url: partner.avatar_url,
            },
            created_at: conversation.created_at,
        },
        messages: messages.into_iter().map(MessageResponse::from).collect(),
    }))
}

/// Post a message into the thread with a friend
/// POST /api/chat/:username
pub async fn send_message(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Path(username): Path<String>,
    Json(payload): Json<SendChatMessage>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::UnprocessableEntity(e.to_string()))?;

    let partner = match validate_chat_partner(&pool, claims.sub, &username).await? {
        ChatPartner::SelfChat => {
            return Ok(ApiResponse::success_with_message(
                "Messaging yourself is not supported.".to_string(),
                ChatThreadResponse::SelfChat,
            ))
        }
        ChatPartner::NotFriends(username) => {
            return Ok(ApiResponse::success_with_message(
                "You can only chat with accepted connections.".to_string(),
                ChatThreadResponse::NotFriends { username },
            ))
        }
        ChatPartner::Friend(partner) => partner,
    };

    let (conversation, _) = conversation_between(&pool, claims.sub, partner.id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to resolve conversation: {:?}", e);
            AppError::InternalServerError
        })?;

    let message = sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages (id, conversation_id, sender_id, body, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(conversation.id)
    .bind(claims.sub)
    .bind(&payload.body)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to send message: {:?}", e);
        AppError::InternalServerError
    })?;

    let (sender_username, sender_avatar_url) = sqlx::query_as::<_, (String, String)>(
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

    Ok(ApiResponse::success_with_message(
        "Message sent.".to_string(),
        ChatThreadResponse::Sent {
            message: MessageResponse {
                id: message.id,
                sender: ChatUser {
                    id: claims.sub,
                    username: sender_username,
                    avatar_url: sender_avatar_url,
                },
                body: message.body,
                created_at: message.created_at,
            },
        },
    ))
}

/// The authenticated user's conversations, newest first
/// GET /api/chat
pub async fn get_conversations(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, ConversationRow>(
        r#"
        SELECT c.id, c.created_at,
               u.id AS other_id, u.username AS other_username,
               p.avatar_url AS other_avatar_url
        FROM conversations c
        JOIN users u ON u.id = CASE WHEN c.user_a_id = $1 THEN c.user_b_id ELSE c.user_a_id END
        JOIN profiles p ON p.user_id = u.id
        WHERE c.user_a_id = $1 OR c.user_b_id = $1
        ORDER BY c.created_at DESC
        "#,
    )
    .bind(claims.sub)
    .fetch_all(&pool)
    .await
    .map_err(|_| AppError::InternalServerError)?;

    let conversations: Vec<ConversationInfo> =
        rows.into_iter().map(ConversationInfo::from).collect();

    Ok(ApiResponse::success(conversations))
}

/// Checks that a chat with `username` may start: the target must exist, must
/// not be the viewer, and must be an accepted friend. Runs before any
/// conversation row is touched.
async fn validate_chat_partner(
    pool: &PgPool,
    viewer_id: Uuid,
    username: &str,
) -> Result<ChatPartner, AppError> {
    let target = sqlx::query_as::<_, PartnerRow>(
        r#"
        SELECT u.id, u.username, p.avatar_url FROM users u
        JOIN profiles p ON p.user_id = u.id
        WHERE u.username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .map_err(|_| AppError::InternalServerError)?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    if target.id == viewer_id {
        return Ok(ChatPartner::SelfChat);
    }

    if !graph::are_friends(pool, viewer_id, target.id)
        .await
        .map_err(|_| AppError::InternalServerError)?
    {
        return Ok(ChatPartner::NotFriends(target.username));
    }

    Ok(ChatPartner::Friend(target))
}

/// Finds the unique conversation for the unordered pair, creating it on
/// first contact. Calling this any number of times for the same pair yields
/// the same row; a concurrent duplicate insert loses on the pair's unique
/// key and falls back to the fetch.
async fn conversation_between(
    pool: &PgPool,
    a: Uuid,
    b: Uuid,
) -> Result<(Conversation, bool), sqlx::Error> {
    let (user_a, user_b) = ordered_pair(a, b);

    if let Some(existing) = sqlx::query_as::<_, Conversation>(
        "SELECT * FROM conversations WHERE user_a_id = $1 AND user_b_id = $2",
    )
    .bind(user_a)
    .bind(user_b)
    .fetch_optional(pool)
    .await?
    {
        return Ok((existing, false));
    }

    let inserted = sqlx::query_as::<_, Conversation>(
        r#"
        INSERT INTO conversations (id, user_a_id, user_b_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_a_id, user_b_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_a)
    .bind(user_b)
    .fetch_optional(pool)
    .await?;

    match inserted {
        Some(conversation) => Ok((conversation, true)),
        None => {
            let existing = sqlx::query_as::<_, Conversation>(
                "SELECT * FROM conversations WHERE user_a_id = $1 AND user_b_id = $2",
            )
            .bind(user_a)
            .bind(user_b)
            .fetch_one(pool)
            .await?;
            Ok((existing, false))
        }
    }
}
