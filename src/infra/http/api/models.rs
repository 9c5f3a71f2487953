//! Request and response bodies for the JSON API.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::ProfileCounts;
use crate::application::users::Profile;
use crate::domain::entities::UserRecord;
use crate::domain::types::{PostStatus, Rating};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The caller's own account. Email is only ever echoed back to its owner.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub website: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&UserRecord> for AccountResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            name: user.name.clone(),
            bio: user.bio.clone(),
            avatar_url: user.avatar_url.clone(),
            website: user.website.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: AccountResponse,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub website: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub counts: ProfileCounts,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        let Profile { user, counts } = profile;
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
            bio: user.bio,
            avatar_url: user.avatar_url,
            website: user.website,
            created_at: user.created_at,
            counts,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct ProfileUpdateRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub website: Option<String>,
}

fn default_rating() -> Rating {
    Rating::Teen
}

fn default_status() -> PostStatus {
    PostStatus::Draft
}

#[derive(Debug, Deserialize)]
pub struct PostCreateRequest {
    pub title: String,
    pub content: String,
    #[serde(default = "default_rating")]
    pub rating: Rating,
    #[serde(default = "default_status")]
    pub status: PostStatus,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PostUpdateRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub rating: Option<Rating>,
    pub status: Option<PostStatus>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct CommentCreateRequest {
    pub content: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CommentUpdateRequest {
    pub content: String,
}
