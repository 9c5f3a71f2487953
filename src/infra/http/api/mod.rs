pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod state;

pub use rate_limit::ApiRateLimiter;
pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post, put},
};

use crate::infra::http::middleware::{log_responses, set_request_context};

pub fn build_api_router(state: ApiState) -> Router {
    let auth_state = state.clone();
    let rate_state = state.clone();

    Router::new()
        .route("/api/v1/auth/register", post(handlers::register))
        .route("/api/v1/auth/login", post(handlers::login))
        .route("/api/v1/auth/me", get(handlers::me))
        .route(
            "/api/v1/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route(
            "/api/v1/posts/{id}",
            get(handlers::get_post)
                .patch(handlers::update_post)
                .delete(handlers::delete_post),
        )
        .route(
            "/api/v1/posts/{id}/like",
            post(handlers::like_post).delete(handlers::unlike_post),
        )
        .route(
            "/api/v1/posts/{id}/collect",
            post(handlers::collect_post).delete(handlers::uncollect_post),
        )
        .route("/api/v1/posts/{id}/view", post(handlers::record_view))
        .route(
            "/api/v1/posts/{id}/comments",
            get(handlers::list_comments).post(handlers::create_comment),
        )
        .route(
            "/api/v1/comments/{id}",
            axum::routing::patch(handlers::update_comment).delete(handlers::delete_comment),
        )
        .route("/api/v1/comments/{id}/replies", get(handlers::list_replies))
        .route(
            "/api/v1/comments/{id}/like",
            post(handlers::like_comment).delete(handlers::unlike_comment),
        )
        .route("/api/v1/users/me/profile", put(handlers::update_profile))
        .route(
            "/api/v1/users/me/followers/{follower_id}",
            delete(handlers::remove_follower),
        )
        .route(
            "/api/v1/users/username/{username}",
            get(handlers::get_user_by_username),
        )
        .route("/api/v1/users/{id}", get(handlers::get_user))
        .route("/api/v1/users/{id}/posts", get(handlers::list_user_posts))
        .route(
            "/api/v1/users/{id}/follow",
            post(handlers::follow_user).delete(handlers::unfollow_user),
        )
        .route(
            "/api/v1/users/{id}/follow-status",
            get(handlers::follow_status),
        )
        .route("/api/v1/users/{id}/followers", get(handlers::list_followers))
        .route("/api/v1/users/{id}/following", get(handlers::list_following))
        .route(
            "/api/v1/users/{id}/liked-posts",
            get(handlers::list_liked_posts),
        )
        .route(
            "/api/v1/users/{id}/collected-posts",
            get(handlers::list_collected_posts),
        )
        .route("/api/v1/tags", get(handlers::list_tags))
        .route("/api/v1/tags/name/{name}", get(handlers::get_tag_by_name))
        .route("/api/v1/tags/{id}", get(handlers::get_tag))
        .route(
            "/api/v1/tags/{id}/subscribe",
            post(handlers::subscribe_tag).delete(handlers::unsubscribe_tag),
        )
        .route("/api/v1/feed", get(handlers::subscription_feed))
        .route("/api/v1/search", get(handlers::search))
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(
            rate_state,
            middleware::api_rate_limit,
        ))
        .layer(axum_middleware::from_fn_with_state(
            auth_state,
            middleware::authenticate,
        ))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
