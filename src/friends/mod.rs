use serde::{Deserialize, Serialize};
use sqlx::prelude::Type;
use uuid::Uuid;
use validator::Validate;

pub mod graph;
pub mod handler;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct FriendRequest {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub status: RequestStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub responded_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "friend_request_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
}

impl RequestStatus {
    /// Accepted and declined are terminal; a resolved request is never
    /// mutated again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendFriendRequest {
    #[validate(length(min = 1, message = "Username cannot be empty"))]
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct RespondFriendRequest {
    pub decision: Decision,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Decline,
}

/// Result of a send attempt, tagged so clients branch on `outcome` rather
/// than parsing messages.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SendRequestOutcome {
    Sent { request_id: Uuid },
    AlreadyPending,
    PreviouslyResolved,
    AlreadyFriends,
    /// The target already had a pending request pointed back at the sender;
    /// that request was accepted in place of creating a mirror row.
    MutualAccepted,
    SelfRequest,
}

/// An incoming pending request, shown so the receiver can respond.
#[derive(Debug, Serialize)]
pub struct PendingRequestResponse {
    pub id: Uuid,
    pub sender: RequestSender,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct RequestSender {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: String,
}

/// A friend in the authenticated user's friend list.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct FriendResponse {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: String,
    pub job_title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(RequestStatus::Accepted.is_terminal());
        assert!(RequestStatus::Declined.is_terminal());
    }

    #[test]
    fn outcomes_serialize_with_stable_tags() {
        let sent = serde_json::to_value(SendRequestOutcome::Sent {
            request_id: Uuid::nil(),
        })
        .unwrap();
        assert_eq!(sent["outcome"], "sent");

        let pending = serde_json::to_value(SendRequestOutcome::AlreadyPending).unwrap();
        assert_eq!(pending["outcome"], "already_pending");

        let mutual = serde_json::to_value(SendRequestOutcome::MutualAccepted).unwrap();
        assert_eq!(mutual["outcome"], "mutual_accepted");
    }

    #[test]
    fn decision_deserializes_lowercase() {
        let decision: Decision = serde_json::from_str("\"accept\"").unwrap();
        assert_eq!(decision, Decision::Accept);
        let decision: Decision = serde_json::from_str("\"decline\"").unwrap();
        assert_eq!(decision, Decision::Decline);
    }
}
