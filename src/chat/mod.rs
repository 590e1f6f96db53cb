use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub mod handler;

/// A two-party conversation. Participants are stored in canonical order
/// (`user_a_id < user_b_id`) so the pair carries a unique key.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub user_a_id: Uuid,
    pub user_b_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Canonical participant order; {A,B} and {B,A} map to the same pair.
pub fn ordered_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendChatMessage {
    #[validate(length(min = 1, max = 5000, message = "Message cannot be empty"))]
    pub body: String,
}

/// Result of opening or posting into a chat thread. Denials are outcomes,
/// not errors: they never create or touch a conversation row.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChatThreadResponse {
    Open {
        conversation: ConversationInfo,
        messages: Vec<MessageResponse>,
    },
    Sent {
        message: MessageResponse,
    },
    SelfChat,
    NotFriends {
        username: String,
    },
}

#[derive(Debug, Serialize)]
pub struct ConversationInfo {
    pub id: Uuid,
    pub other: ChatUser,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub sender: ChatUser,
    pub body: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct ChatUser {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_pair_is_order_insensitive() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(ordered_pair(a, b), ordered_pair(b, a));
    }

    #[test]
    fn ordered_pair_puts_lower_id_first() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (lo, hi) = ordered_pair(a, b);
        assert!(lo < hi);
    }

    #[test]
    fn denials_serialize_with_stable_tags() {
        let denied = serde_json::to_value(ChatThreadResponse::SelfChat).unwrap();
        assert_eq!(denied["outcome"], "self_chat");

        let denied = serde_json::to_value(ChatThreadResponse::NotFriends {
            username: "charlie".to_string(),
        })
        .unwrap();
        assert_eq!(denied["outcome"], "not_friends");
        assert_eq!(denied["username"], "charlie");
    }
}
