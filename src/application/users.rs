//! Profiles and the follow graph.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    FollowState, FollowsRepo, ProfileCounts, RepoError, UpdateProfileParams, UsersRepo,
};
use crate::domain::entities::{UserRecord, UserSummary};

const MAX_NAME_LEN: usize = 50;
const MAX_BIO_LEN: usize = 500;

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("user not found")]
    NotFound,
    #[error("username already taken")]
    UsernameTaken,
    #[error("cannot follow yourself")]
    SelfFollow,
    #[error("validation failed: {0}")]
    Validation(&'static str),
}

/// Public profile: the user row plus aggregate counts.
#[derive(Debug, Clone)]
pub struct Profile {
    pub user: UserRecord,
    pub counts: ProfileCounts,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProfileCommand {
    pub name: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub website: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl UserService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { users, follows }
    }

    pub async fn profile_by_id(&self, id: Uuid) -> Result<Profile, UserError> {
        let user = self.users.find_by_id(id).await?.ok_or(UserError::NotFound)?;
        self.with_counts(user).await
    }

    pub async fn profile_by_username(&self, username: &str) -> Result<Profile, UserError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(UserError::NotFound)?;
        self.with_counts(user).await
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        command: UpdateProfileCommand,
    ) -> Result<Profile, UserError> {
        if let Some(name) = command.name.as_deref() {
            let trimmed = name.trim();
            if trimmed.is_empty() || trimmed.len() > MAX_NAME_LEN {
                return Err(UserError::Validation("name must be 1-50 characters"));
            }
        }
        if let Some(bio) = command.bio.as_deref()
            && bio.len() > MAX_BIO_LEN
        {
            return Err(UserError::Validation("bio must be at most 500 characters"));
        }
        if let Some(avatar_url) = command.avatar_url.as_deref() {
            ensure_http_url(avatar_url, "avatar_url must be an http(s) URL")?;
        }
        if let Some(website) = command.website.as_deref() {
            ensure_http_url(website, "website must be an http(s) URL")?;
        }

        let user = self
            .users
            .update_profile(UpdateProfileParams {
                id: user_id,
                name: command.name.map(|s| s.trim().to_string()),
                username: command.username.map(|s| s.trim().to_string()),
                bio: command.bio,
                avatar_url: command.avatar_url,
                website: command.website,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { ref constraint } if constraint.contains("username") => {
                    UserError::UsernameTaken
                }
                RepoError::NotFound => UserError::NotFound,
                other => UserError::Repo(other),
            })?;

        self.with_counts(user).await
    }

    pub async fn follow(&self, follower: Uuid, target: Uuid) -> Result<FollowState, UserError> {
        if follower == target {
            return Err(UserError::SelfFollow);
        }
        self.ensure_exists(target).await?;

        let created = self.follows.insert_follow(follower, target).await?;
        if created {
            debug!(target = "calamus::follows", %follower, following = %target, "follow created");
        }
        self.follows
            .follow_state(follower, target)
            .await
            .map_err(UserError::from)
    }

    pub async fn unfollow(&self, follower: Uuid, target: Uuid) -> Result<FollowState, UserError> {
        self.ensure_exists(target).await?;
        self.follows.delete_follow(follower, target).await?;
        self.follows
            .follow_state(follower, target)
            .await
            .map_err(UserError::from)
    }

    pub async fn follow_status(&self, viewer: Uuid, target: Uuid) -> Result<FollowState, UserError> {
        self.ensure_exists(target).await?;
        self.follows
            .follow_state(viewer, target)
            .await
            .map_err(UserError::from)
    }

    /// Drop `follower` from the caller's follower list.
    pub async fn remove_follower(&self, user_id: Uuid, follower: Uuid) -> Result<(), UserError> {
        let removed = self.follows.delete_follow(follower, user_id).await?;
        if !removed {
            return Err(UserError::NotFound);
        }
        Ok(())
    }

    pub async fn list_followers(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<UserSummary>, UserError> {
        self.ensure_exists(user_id).await?;
        self.follows
            .list_followers(user_id, page)
            .await
            .map_err(UserError::from)
    }

    pub async fn list_following(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<UserSummary>, UserError> {
        self.ensure_exists(user_id).await?;
        self.follows
            .list_following(user_id, page)
            .await
            .map_err(UserError::from)
    }

    async fn ensure_exists(&self, id: Uuid) -> Result<(), UserError> {
        match self.users.find_by_id(id).await? {
            Some(_) => Ok(()),
            None => Err(UserError::NotFound),
        }
    }

    async fn with_counts(&self, user: UserRecord) -> Result<Profile, UserError> {
        let counts = self.users.profile_counts(user.id).await?;
        Ok(Profile { user, counts })
    }
}

fn ensure_http_url(value: &str, message: &'static str) -> Result<(), UserError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(UserError::Validation(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_fields_must_be_http() {
        assert!(ensure_http_url("https://cdn.example.com/a.png", "msg").is_ok());
        assert!(ensure_http_url("http://example.com", "msg").is_ok());
        assert!(ensure_http_url("ftp://example.com", "msg").is_err());
        assert!(ensure_http_url("javascript:alert(1)", "msg").is_err());
    }
}
