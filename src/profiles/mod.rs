use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::posts::PostResponse;

pub mod handler;

/// Database model for a profile; always exists alongside its user row.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub user_id: Uuid,
    pub bio: String,
    pub location: String,
    pub job_title: String,
    pub portfolio_url: String,
    pub avatar_url: String,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Request payload for updating one's own profile; omitted fields are left
/// unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfile {
    #[validate(length(max = 1000, message = "Bio is too long"))]
    pub bio: Option<String>,
    #[validate(length(max = 100, message = "Location is too long"))]
    pub location: Option<String>,
    #[validate(length(max = 100, message = "Job title is too long"))]
    pub job_title: Option<String>,
    #[validate(url(message = "Portfolio URL must be a valid URL"))]
    pub portfolio_url: Option<String>,
    #[validate(url(message = "Avatar URL must be a valid URL"))]
    pub avatar_url: Option<String>,
}

/// The profile page aggregate: owner info, profile fields, the owner's posts
/// as visible to the viewer, and where the viewer stands with them.
#[derive(Debug, Serialize)]
pub struct ProfilePageResponse {
    pub user: ProfileUser,
    pub bio: String,
    pub location: String,
    pub job_title: String,
    pub portfolio_url: String,
    pub avatar_url: String,
    pub posts: Vec<PostResponse>,
    pub friendship: FriendshipStatus,
}

#[derive(Debug, Serialize)]
pub struct ProfileUser {
    pub id: Uuid,
    pub username: String,
}

/// Friend-request state between the viewer and the profile owner, so a
/// client can render the right action button.
#[derive(Debug, Serialize)]
pub struct FriendshipStatus {
    pub is_friend: bool,
    pub outgoing_pending: bool,
    pub incoming_pending: bool,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user_id: Uuid,
    pub bio: String,
    pub location: String,
    pub job_title: String,
    pub portfolio_url: String,
    pub avatar_url: String,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Profile> for ProfileResponse {
    fn from(p: Profile) -> Self {
        ProfileResponse {
            user_id: p.user_id,
            bio: p.bio,
            location: p.location,
            job_title: p.job_title,
            portfolio_url: p.portfolio_url,
            avatar_url: p.avatar_url,
            updated_at: p.updated_at,
        }
    }
}
