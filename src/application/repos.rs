//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::domain::entities::{CommentRecord, PostRecord, TagRecord, UserRecord, UserSummary};
use crate::domain::types::{PostSort, PostStatus, Rating, SearchSort, SortOrder};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

// ----- Users -----

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub email: String,
    pub username: String,
    pub name: String,
    pub password_hash: String,
}

/// Partial profile update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateProfileParams {
    pub id: Uuid,
    pub name: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProfileCounts {
    pub posts: u64,
    pub followers: u64,
    pub following: u64,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn update_profile(&self, params: UpdateProfileParams) -> Result<UserRecord, RepoError>;

    async fn profile_counts(&self, user_id: Uuid) -> Result<ProfileCounts, RepoError>;
}

// ----- Follow graph -----

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FollowState {
    pub following: bool,
    pub followed_by: bool,
}

#[async_trait]
pub trait FollowsRepo: Send + Sync {
    /// Returns `false` when the edge already existed.
    async fn insert_follow(&self, follower: Uuid, following: Uuid) -> Result<bool, RepoError>;

    /// Returns `false` when there was no edge to remove.
    async fn delete_follow(&self, follower: Uuid, following: Uuid) -> Result<bool, RepoError>;

    async fn follow_state(&self, viewer: Uuid, target: Uuid) -> Result<FollowState, RepoError>;

    async fn list_followers(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<UserSummary>, RepoError>;

    async fn list_following(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<UserSummary>, RepoError>;
}

// ----- Posts -----

/// Post as presented in listings and detail reads: author, tags, and
/// engagement counters are resolved alongside the row.
#[derive(Debug, Clone, Serialize)]
pub struct PostOverview {
    pub id: Uuid,
    pub author: UserSummary,
    pub title: String,
    pub content: String,
    pub rating: Rating,
    pub status: PostStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    pub view_count: i64,
    pub like_count: i64,
    pub collection_count: i64,
    pub comment_count: i64,
    pub tags: Vec<TagRecord>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: PostOverview,
    /// Present only when the request carried an authenticated viewer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_liked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_collected: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostListScope {
    /// Published posts only.
    Public,
    /// Every status; used when the author browses their own work.
    All,
}

#[derive(Debug, Clone, Default)]
pub struct PostQueryFilter {
    pub author: Option<Uuid>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub rating: Rating,
    pub status: PostStatus,
    pub published_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub rating: Rating,
    pub status: PostStatus,
    pub published_at: Option<OffsetDateTime>,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    async fn load_detail(
        &self,
        id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<Option<PostDetail>, RepoError>;

    async fn list_posts(
        &self,
        scope: PostListScope,
        filter: &PostQueryFilter,
        page: PageRequest,
    ) -> Result<Page<PostOverview>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError>;

    /// Replace the post's tag set, creating missing tags by name. Returns the
    /// attached tags in name order.
    async fn replace_post_tags(
        &self,
        post_id: Uuid,
        tag_names: &[String],
    ) -> Result<Vec<TagRecord>, RepoError>;
}

// ----- Engagement (likes, collections, views) -----

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewOutcome {
    /// The view was counted and the post counter incremented.
    Counted { view_count: i64 },
    /// The fingerprint already viewed the post inside the dedup window.
    Deduplicated { view_count: i64 },
}

impl ViewOutcome {
    pub fn view_count(self) -> i64 {
        match self {
            ViewOutcome::Counted { view_count } | ViewOutcome::Deduplicated { view_count } => {
                view_count
            }
        }
    }

    pub fn counted(self) -> bool {
        matches!(self, ViewOutcome::Counted { .. })
    }
}

#[async_trait]
pub trait EngagementRepo: Send + Sync {
    /// Set the like edge to `liked`; returns `false` when nothing changed.
    async fn set_post_like(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        liked: bool,
    ) -> Result<bool, RepoError>;

    async fn count_post_likes(&self, post_id: Uuid) -> Result<i64, RepoError>;

    async fn set_post_collection(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        collected: bool,
    ) -> Result<bool, RepoError>;

    async fn count_post_collections(&self, post_id: Uuid) -> Result<i64, RepoError>;

    async fn set_comment_like(
        &self,
        user_id: Uuid,
        comment_id: Uuid,
        liked: bool,
    ) -> Result<bool, RepoError>;

    async fn count_comment_likes(&self, comment_id: Uuid) -> Result<i64, RepoError>;

    /// Apply the view-dedup rule in one transaction: a view is counted when
    /// the fingerprint has no recorded view newer than `dedup_cutoff`, in
    /// which case the view row is refreshed and `posts.view_count` is
    /// incremented atomically.
    async fn record_view(
        &self,
        post_id: Uuid,
        viewer: &str,
        dedup_cutoff: OffsetDateTime,
    ) -> Result<ViewOutcome, RepoError>;

    async fn list_liked_posts(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<PostOverview>, RepoError>;

    async fn list_collected_posts(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<PostOverview>, RepoError>;
}

// ----- Comments -----

/// Comment as presented to clients: author plus engagement counters.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub author: UserSummary,
    pub content: String,
    pub like_count: i64,
    pub reply_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: CommentView,
    /// Oldest replies first, capped at the preview size.
    pub replies: Vec<CommentView>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError>;

    async fn create_comment(&self, params: CreateCommentParams) -> Result<CommentView, RepoError>;

    async fn update_comment(&self, id: Uuid, content: String) -> Result<CommentView, RepoError>;

    async fn delete_comment(&self, id: Uuid) -> Result<(), RepoError>;

    /// Top-level comments newest-first, each with a preview of its replies.
    async fn list_threads(
        &self,
        post_id: Uuid,
        page: PageRequest,
        reply_preview: u32,
    ) -> Result<Page<CommentThread>, RepoError>;

    /// Replies under one comment, oldest first.
    async fn list_replies(
        &self,
        parent_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<CommentView>, RepoError>;
}

// ----- Tags -----

#[derive(Debug, Clone, Serialize)]
pub struct TagWithCount {
    pub id: Uuid,
    pub name: String,
    pub post_count: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TagEngagement {
    pub post_count: u64,
    pub subscriber_count: u64,
}

#[async_trait]
pub trait TagsRepo: Send + Sync {
    /// All tags with their published-post counts, name ordered.
    async fn list_with_counts(&self) -> Result<Vec<TagWithCount>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TagRecord>, RepoError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<TagRecord>, RepoError>;

    async fn tag_engagement(&self, id: Uuid) -> Result<TagEngagement, RepoError>;

    async fn list_tag_posts(
        &self,
        tag_id: Uuid,
        sort: PostSort,
        order: SortOrder,
        page: PageRequest,
    ) -> Result<Page<PostOverview>, RepoError>;

    /// Set the subscription edge; returns `false` when nothing changed.
    async fn set_subscription(
        &self,
        user_id: Uuid,
        tag_id: Uuid,
        subscribed: bool,
    ) -> Result<bool, RepoError>;
}

// ----- Subscription feed -----

#[async_trait]
pub trait FeedRepo: Send + Sync {
    /// Published posts by authors the user follows, with `published_at` at or
    /// after `since`, newest first.
    async fn list_followed_posts(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
        page: PageRequest,
    ) -> Result<Page<PostOverview>, RepoError>;
}

// ----- Search -----

#[derive(Debug, Clone)]
pub struct SearchFilter {
    pub query: String,
    pub date_from: Option<OffsetDateTime>,
    pub date_to: Option<OffsetDateTime>,
    pub sort: SearchSort,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostHeadline {
    pub id: Uuid,
    pub title: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSearchHit {
    #[serde(flatten)]
    pub user: UserSummary,
    pub latest_posts: Vec<PostHeadline>,
}

#[async_trait]
pub trait SearchRepo: Send + Sync {
    async fn search_posts(
        &self,
        filter: &SearchFilter,
        page: PageRequest,
    ) -> Result<Page<PostOverview>, RepoError>;

    async fn search_users(
        &self,
        filter: &SearchFilter,
        page: PageRequest,
    ) -> Result<Page<UserSearchHit>, RepoError>;

    async fn search_tags(
        &self,
        filter: &SearchFilter,
        page: PageRequest,
    ) -> Result<Page<TagWithCount>, RepoError>;
}
