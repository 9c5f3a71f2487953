//! Subscription feed: recent posts from followed authors.

use std::sync::Arc;

use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{FeedRepo, PostOverview, RepoError};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FeedService {
    feed: Arc<dyn FeedRepo>,
    window_days: u32,
    default_page_size: u32,
}

impl FeedService {
    pub fn new(feed: Arc<dyn FeedRepo>, window_days: u32, default_page_size: u32) -> Self {
        Self {
            feed,
            window_days,
            default_page_size,
        }
    }

    pub fn default_page_size(&self) -> u32 {
        self.default_page_size
    }

    /// Published posts from followed authors inside the trailing window,
    /// newest first.
    pub async fn subscription_feed(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<PostOverview>, FeedError> {
        let since = OffsetDateTime::now_utc() - Duration::days(i64::from(self.window_days));
        self.feed
            .list_followed_posts(user_id, since, page)
            .await
            .map_err(FeedError::from)
    }
}
