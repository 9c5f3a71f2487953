//! Creative-work lifecycle: authoring, publication workflow, engagement,
//! and view counting.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CreatePostParams, EngagementRepo, PostDetail, PostListScope, PostOverview, PostQueryFilter,
    PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams, ViewOutcome,
};
use crate::domain::entities::PostRecord;
use crate::domain::error::DomainError;
use crate::domain::posts::{ensure_content, normalize_tags, normalize_title};
use crate::domain::types::{PostStatus, Rating};

#[derive(Debug, Error)]
pub enum PostError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("post not found")]
    NotFound,
    #[error("only the author may modify this post")]
    Forbidden,
}

#[derive(Debug, Clone)]
pub struct CreatePostCommand {
    pub title: String,
    pub content: String,
    pub rating: Rating,
    pub status: PostStatus,
    pub tags: Vec<String>,
}

/// Partial update; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct UpdatePostCommand {
    pub title: Option<String>,
    pub content: Option<String>,
    pub rating: Option<Rating>,
    pub status: Option<PostStatus>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LikeState {
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CollectionState {
    pub collected: bool,
    pub collection_count: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ViewReceipt {
    pub counted: bool,
    pub view_count: i64,
}

#[derive(Clone)]
pub struct PostService {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    engagement: Arc<dyn EngagementRepo>,
    view_dedup_window: Duration,
}

impl PostService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        engagement: Arc<dyn EngagementRepo>,
        view_dedup_window: Duration,
    ) -> Self {
        Self {
            reader,
            writer,
            engagement,
            view_dedup_window,
        }
    }

    pub async fn create_post(
        &self,
        author_id: Uuid,
        command: CreatePostCommand,
    ) -> Result<PostDetail, PostError> {
        let title = normalize_title(&command.title)?;
        ensure_content(&command.content)?;
        let tags = normalize_tags(command.tags)?;

        let published_at = match command.status {
            PostStatus::Published => Some(OffsetDateTime::now_utc()),
            PostStatus::Draft | PostStatus::Archived => None,
        };

        let post = self
            .writer
            .create_post(CreatePostParams {
                author_id,
                title,
                content: command.content,
                rating: command.rating,
                status: command.status,
                published_at,
            })
            .await?;

        if !tags.is_empty() {
            self.writer.replace_post_tags(post.id, &tags).await?;
        }

        self.load_detail_or_missing(post.id, Some(author_id)).await
    }

    pub async fn update_post(
        &self,
        viewer: Uuid,
        id: Uuid,
        command: UpdatePostCommand,
    ) -> Result<PostDetail, PostError> {
        let existing = self.authored_post(viewer, id).await?;

        let status = command.status.unwrap_or(existing.status);
        let published_at = existing.published_at_after(status, OffsetDateTime::now_utc());
        let title = match command.title {
            Some(title) => normalize_title(&title)?,
            None => existing.title,
        };
        let content = match command.content {
            Some(content) => {
                ensure_content(&content)?;
                content
            }
            None => existing.content,
        };

        let post = self
            .writer
            .update_post(UpdatePostParams {
                id,
                title,
                content,
                rating: command.rating.unwrap_or(existing.rating),
                status,
                published_at,
            })
            .await?;

        if let Some(tags) = command.tags {
            let tags = normalize_tags(tags)?;
            self.writer.replace_post_tags(post.id, &tags).await?;
        }

        self.load_detail_or_missing(post.id, Some(viewer)).await
    }

    pub async fn delete_post(&self, viewer: Uuid, id: Uuid) -> Result<(), PostError> {
        self.authored_post(viewer, id).await?;
        self.writer.delete_post(id).await?;
        debug!(target = "calamus::posts", post_id = %id, "post deleted");
        Ok(())
    }

    /// Load a post for display. Drafts and archived posts resolve only for
    /// their author; everyone else observes a missing resource.
    pub async fn get_post(
        &self,
        viewer: Option<Uuid>,
        id: Uuid,
    ) -> Result<PostDetail, PostError> {
        let detail = self
            .reader
            .load_detail(id, viewer)
            .await?
            .ok_or(PostError::NotFound)?;

        if detail.post.status != PostStatus::Published && viewer != Some(detail.post.author.id) {
            return Err(PostError::NotFound);
        }

        Ok(detail)
    }

    pub async fn list_public(
        &self,
        filter: &PostQueryFilter,
        page: PageRequest,
    ) -> Result<Page<PostOverview>, PostError> {
        self.reader
            .list_posts(PostListScope::Public, filter, page)
            .await
            .map_err(PostError::from)
    }

    /// A user's posts: every status when the author is browsing their own
    /// work, published only otherwise.
    pub async fn list_by_author(
        &self,
        viewer: Option<Uuid>,
        author_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<PostOverview>, PostError> {
        let scope = if viewer == Some(author_id) {
            PostListScope::All
        } else {
            PostListScope::Public
        };
        let filter = PostQueryFilter {
            author: Some(author_id),
            ..PostQueryFilter::default()
        };
        self.reader
            .list_posts(scope, &filter, page)
            .await
            .map_err(PostError::from)
    }

    pub async fn set_like(
        &self,
        viewer: Uuid,
        post_id: Uuid,
        liked: bool,
    ) -> Result<LikeState, PostError> {
        self.visible_post(Some(viewer), post_id).await?;
        self.engagement.set_post_like(viewer, post_id, liked).await?;
        let like_count = self.engagement.count_post_likes(post_id).await?;
        Ok(LikeState { liked, like_count })
    }

    pub async fn set_collection(
        &self,
        viewer: Uuid,
        post_id: Uuid,
        collected: bool,
    ) -> Result<CollectionState, PostError> {
        self.visible_post(Some(viewer), post_id).await?;
        self.engagement
            .set_post_collection(viewer, post_id, collected)
            .await?;
        let collection_count = self.engagement.count_post_collections(post_id).await?;
        Ok(CollectionState {
            collected,
            collection_count,
        })
    }

    /// Record one view for the given fingerprint. Views repeat-counted inside
    /// the dedup window do not move the counter.
    pub async fn record_view(
        &self,
        post_id: Uuid,
        fingerprint: &str,
    ) -> Result<ViewReceipt, PostError> {
        let post = self
            .reader
            .find_by_id(post_id)
            .await?
            .ok_or(PostError::NotFound)?;
        if post.status != PostStatus::Published {
            return Err(PostError::NotFound);
        }

        let cutoff = OffsetDateTime::now_utc() - self.view_dedup_window;
        let outcome = self
            .engagement
            .record_view(post_id, fingerprint, cutoff)
            .await?;

        match outcome {
            ViewOutcome::Counted { .. } => {
                counter!("calamus_post_view_total").increment(1);
            }
            ViewOutcome::Deduplicated { .. } => {
                counter!("calamus_post_view_deduped_total").increment(1);
            }
        }

        Ok(ViewReceipt {
            counted: outcome.counted(),
            view_count: outcome.view_count(),
        })
    }

    pub async fn list_liked_by(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<PostOverview>, PostError> {
        self.engagement
            .list_liked_posts(user_id, page)
            .await
            .map_err(PostError::from)
    }

    pub async fn list_collected_by(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<PostOverview>, PostError> {
        self.engagement
            .list_collected_posts(user_id, page)
            .await
            .map_err(PostError::from)
    }

    async fn authored_post(&self, viewer: Uuid, id: Uuid) -> Result<PostRecord, PostError> {
        let post = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(PostError::NotFound)?;
        if post.author_id != viewer {
            return Err(PostError::Forbidden);
        }
        Ok(post)
    }

    async fn visible_post(&self, viewer: Option<Uuid>, id: Uuid) -> Result<PostRecord, PostError> {
        let post = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(PostError::NotFound)?;
        if !post.visible_to(viewer) {
            return Err(PostError::NotFound);
        }
        Ok(post)
    }

    async fn load_detail_or_missing(
        &self,
        id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<PostDetail, PostError> {
        self.reader
            .load_detail(id, viewer)
            .await?
            .ok_or(PostError::NotFound)
    }
}
