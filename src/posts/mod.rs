use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::prelude::Type;
use uuid::Uuid;
use validator::Validate;

pub mod handler;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub message: String,
    pub visibility: Visibility,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "post_visibility", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Friends,
}

impl Visibility {
    /// Whether a post with this visibility, written by `author_id`, is
    /// readable by `viewer_id` given the viewer's friend set.
    ///
    /// Authors always see their own posts; the friend set never contains
    /// self, so the friends-only arm alone would hide them.
    pub fn readable_by(&self, author_id: Uuid, viewer_id: Uuid, friends: &HashSet<Uuid>) -> bool {
        if author_id == viewer_id {
            return true;
        }
        match self {
            Visibility::Public => true,
            Visibility::Friends => friends.contains(&author_id),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePost {
    #[validate(length(min = 1, max = 5000, message = "Message cannot be empty"))]
    pub message: String,
    #[serde(default)]
    pub visibility: Visibility,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub author: PostAuthor,
    pub message: String,
    pub visibility: Visibility,
    pub like_count: i64,
    pub comment_count: i64,
    pub liked_by_viewer: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct PostAuthor {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: String,
}

/// Like state of a post after a toggle.
#[derive(Debug, Serialize)]
pub struct LikeStateResponse {
    pub post_id: Uuid,
    pub liked: bool,
    pub like_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn friend_set(ids: &[Uuid]) -> HashSet<Uuid> {
        ids.iter().copied().collect()
    }

    #[test]
    fn public_posts_visible_to_strangers() {
        let author = Uuid::new_v4();
        let viewer = Uuid::new_v4();
        assert!(Visibility::Public.readable_by(author, viewer, &friend_set(&[])));
    }

    #[test]
    fn friends_only_hidden_from_strangers() {
        let author = Uuid::new_v4();
        let viewer = Uuid::new_v4();
        assert!(!Visibility::Friends.readable_by(author, viewer, &friend_set(&[])));
    }

    #[test]
    fn friends_only_visible_to_friends() {
        let author = Uuid::new_v4();
        let viewer = Uuid::new_v4();
        assert!(Visibility::Friends.readable_by(author, viewer, &friend_set(&[author])));
    }

    #[test]
    fn authors_always_see_their_own_posts() {
        let author = Uuid::new_v4();
        assert!(Visibility::Friends.readable_by(author, author, &friend_set(&[])));
        assert!(Visibility::Public.readable_by(author, author, &friend_set(&[])));
    }
}
