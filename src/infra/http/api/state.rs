use std::sync::Arc;

use crate::application::auth::AuthService;
use crate::application::comments::CommentService;
use crate::application::feed::FeedService;
use crate::application::posts::PostService;
use crate::application::search::SearchService;
use crate::application::tags::TagService;
use crate::application::users::UserService;
use crate::infra::db::PostgresRepositories;

use super::rate_limit::ApiRateLimiter;

#[derive(Clone)]
pub struct ApiState {
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub tags: Arc<TagService>,
    pub feed: Arc<FeedService>,
    pub search: Arc<SearchService>,
    pub db: Arc<PostgresRepositories>,
    pub rate_limiter: Arc<ApiRateLimiter>,
}
