//! Threaded discussion under posts.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CommentThread, CommentView, CommentsRepo, CreateCommentParams, EngagementRepo, PostsRepo,
    RepoError,
};
use crate::domain::types::PostStatus;

const MAX_COMMENT_LEN: usize = 2000;
/// How many replies are embedded under each top-level comment in a listing.
const REPLY_PREVIEW: u32 = 5;

#[derive(Debug, Error)]
pub enum CommentError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("comment not found")]
    NotFound,
    #[error("post not found")]
    PostNotFound,
    #[error("parent comment does not belong to this post")]
    ParentMismatch,
    #[error("only the author may modify this comment")]
    Forbidden,
    #[error("validation failed: {0}")]
    Validation(&'static str),
}

#[derive(Debug, Clone)]
pub struct CreateCommentCommand {
    pub content: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CommentLikeState {
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentsRepo>,
    posts: Arc<dyn PostsRepo>,
    engagement: Arc<dyn EngagementRepo>,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentsRepo>,
        posts: Arc<dyn PostsRepo>,
        engagement: Arc<dyn EngagementRepo>,
    ) -> Self {
        Self {
            comments,
            posts,
            engagement,
        }
    }

    pub async fn create(
        &self,
        author_id: Uuid,
        post_id: Uuid,
        command: CreateCommentCommand,
    ) -> Result<CommentView, CommentError> {
        ensure_content(&command.content)?;

        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(CommentError::PostNotFound)?;
        if post.status != PostStatus::Published && post.author_id != author_id {
            return Err(CommentError::PostNotFound);
        }

        if let Some(parent_id) = command.parent_id {
            let parent = self
                .comments
                .find_by_id(parent_id)
                .await?
                .ok_or(CommentError::NotFound)?;
            if parent.post_id != post_id {
                return Err(CommentError::ParentMismatch);
            }
        }

        self.comments
            .create_comment(CreateCommentParams {
                post_id,
                author_id,
                parent_id: command.parent_id,
                content: command.content,
            })
            .await
            .map_err(CommentError::from)
    }

    pub async fn list_for_post(
        &self,
        post_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<CommentThread>, CommentError> {
        self.posts
            .find_by_id(post_id)
            .await?
            .ok_or(CommentError::PostNotFound)?;

        self.comments
            .list_threads(post_id, page, REPLY_PREVIEW)
            .await
            .map_err(CommentError::from)
    }

    pub async fn list_replies(
        &self,
        comment_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<CommentView>, CommentError> {
        self.comments
            .find_by_id(comment_id)
            .await?
            .ok_or(CommentError::NotFound)?;

        self.comments
            .list_replies(comment_id, page)
            .await
            .map_err(CommentError::from)
    }

    pub async fn update(
        &self,
        viewer: Uuid,
        comment_id: Uuid,
        content: String,
    ) -> Result<CommentView, CommentError> {
        ensure_content(&content)?;
        self.authored(viewer, comment_id).await?;
        self.comments
            .update_comment(comment_id, content)
            .await
            .map_err(CommentError::from)
    }

    pub async fn delete(&self, viewer: Uuid, comment_id: Uuid) -> Result<(), CommentError> {
        self.authored(viewer, comment_id).await?;
        self.comments
            .delete_comment(comment_id)
            .await
            .map_err(CommentError::from)
    }

    pub async fn set_like(
        &self,
        viewer: Uuid,
        comment_id: Uuid,
        liked: bool,
    ) -> Result<CommentLikeState, CommentError> {
        self.comments
            .find_by_id(comment_id)
            .await?
            .ok_or(CommentError::NotFound)?;

        self.engagement
            .set_comment_like(viewer, comment_id, liked)
            .await?;
        let like_count = self.engagement.count_comment_likes(comment_id).await?;
        Ok(CommentLikeState { liked, like_count })
    }

    async fn authored(&self, viewer: Uuid, comment_id: Uuid) -> Result<(), CommentError> {
        let comment = self
            .comments
            .find_by_id(comment_id)
            .await?
            .ok_or(CommentError::NotFound)?;
        if comment.author_id != viewer {
            return Err(CommentError::Forbidden);
        }
        Ok(())
    }
}

fn ensure_content(content: &str) -> Result<(), CommentError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(CommentError::Validation("comment must not be empty"));
    }
    if trimmed.len() > MAX_COMMENT_LEN {
        return Err(CommentError::Validation(
            "comment must be at most 2000 characters",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_content_bounds() {
        assert!(ensure_content("fine").is_ok());
        assert!(ensure_content("   ").is_err());
        assert!(ensure_content(&"x".repeat(MAX_COMMENT_LEN + 1)).is_err());
    }
}
