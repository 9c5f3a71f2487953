//! Tag lookups, tag post listings, and tag subscriptions.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{PostOverview, RepoError, TagEngagement, TagWithCount, TagsRepo};
use crate::domain::entities::TagRecord;
use crate::domain::types::{PostSort, SortOrder};

#[derive(Debug, Error)]
pub enum TagError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("tag not found")]
    NotFound,
}

/// Tag header plus one page of its published posts.
#[derive(Debug, Clone, Serialize)]
pub struct TagDetail {
    pub tag: TagRecord,
    pub post_count: u64,
    pub subscriber_count: u64,
    pub posts: Page<PostOverview>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SubscriptionState {
    pub subscribed: bool,
}

#[derive(Clone)]
pub struct TagService {
    tags: Arc<dyn TagsRepo>,
}

impl TagService {
    pub fn new(tags: Arc<dyn TagsRepo>) -> Self {
        Self { tags }
    }

    pub async fn list_all(&self) -> Result<Vec<TagWithCount>, TagError> {
        self.tags.list_with_counts().await.map_err(TagError::from)
    }

    pub async fn detail(
        &self,
        tag_id: Uuid,
        sort: PostSort,
        order: SortOrder,
        page: PageRequest,
    ) -> Result<TagDetail, TagError> {
        let tag = self
            .tags
            .find_by_id(tag_id)
            .await?
            .ok_or(TagError::NotFound)?;

        let TagEngagement {
            post_count,
            subscriber_count,
        } = self.tags.tag_engagement(tag_id).await?;
        let posts = self.tags.list_tag_posts(tag_id, sort, order, page).await?;

        Ok(TagDetail {
            tag,
            post_count,
            subscriber_count,
            posts,
        })
    }

    pub async fn by_name(&self, name: &str) -> Result<TagRecord, TagError> {
        self.tags
            .find_by_name(name)
            .await?
            .ok_or(TagError::NotFound)
    }

    pub async fn set_subscription(
        &self,
        user_id: Uuid,
        tag_id: Uuid,
        subscribed: bool,
    ) -> Result<SubscriptionState, TagError> {
        self.tags
            .find_by_id(tag_id)
            .await?
            .ok_or(TagError::NotFound)?;

        self.tags
            .set_subscription(user_id, tag_id, subscribed)
            .await?;
        Ok(SubscriptionState { subscribed })
    }
}
