//! Profiles, follow graph, and per-user post collections.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::application::users::UpdateProfileCommand;

use super::{PageQuery, post_to_api, user_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::middleware::{OptionalAuth, RequireAuth};
use crate::infra::http::api::models::{ProfileResponse, ProfileUpdateRequest};
use crate::infra::http::api::state::ApiState;

pub async fn get_user(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.users.profile_by_id(id).await.map_err(user_to_api)?;
    Ok(Json(ProfileResponse::from(profile)))
}

pub async fn get_user_by_username(
    State(state): State<ApiState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .users
        .profile_by_username(&username)
        .await
        .map_err(user_to_api)?;
    Ok(Json(ProfileResponse::from(profile)))
}

pub async fn update_profile(
    State(state): State<ApiState>,
    RequireAuth(principal): RequireAuth,
    Json(payload): Json<ProfileUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .users
        .update_profile(
            principal.user_id,
            UpdateProfileCommand {
                name: payload.name,
                username: payload.username,
                bio: payload.bio,
                avatar_url: payload.avatar_url,
                website: payload.website,
            },
        )
        .await
        .map_err(user_to_api)?;

    Ok(Json(ProfileResponse::from(profile)))
}

pub async fn list_user_posts(
    State(state): State<ApiState>,
    OptionalAuth(principal): OptionalAuth,
    Path(id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = principal.map(|p| p.user_id);
    let page = PageRequest::new(query.page, query.limit);

    let posts = state
        .posts
        .list_by_author(viewer, id, page)
        .await
        .map_err(post_to_api)?;

    Ok(Json(posts))
}

pub async fn follow_user(
    State(state): State<ApiState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state
        .users
        .follow(principal.user_id, id)
        .await
        .map_err(user_to_api)?;
    Ok(Json(status))
}

pub async fn unfollow_user(
    State(state): State<ApiState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state
        .users
        .unfollow(principal.user_id, id)
        .await
        .map_err(user_to_api)?;
    Ok(Json(status))
}

pub async fn follow_status(
    State(state): State<ApiState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state
        .users
        .follow_status(principal.user_id, id)
        .await
        .map_err(user_to_api)?;
    Ok(Json(status))
}

pub async fn remove_follower(
    State(state): State<ApiState>,
    RequireAuth(principal): RequireAuth,
    Path(follower_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .users
        .remove_follower(principal.user_id, follower_id)
        .await
        .map_err(user_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_followers(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::new(query.page, query.limit);
    let followers = state
        .users
        .list_followers(id, page)
        .await
        .map_err(user_to_api)?;
    Ok(Json(followers))
}

pub async fn list_following(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::new(query.page, query.limit);
    let following = state
        .users
        .list_following(id, page)
        .await
        .map_err(user_to_api)?;
    Ok(Json(following))
}

pub async fn list_liked_posts(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::new(query.page, query.limit);
    let posts = state
        .posts
        .list_liked_by(id, page)
        .await
        .map_err(post_to_api)?;
    Ok(Json(posts))
}

pub async fn list_collected_posts(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::new(query.page, query.limit);
    let posts = state
        .posts
        .list_collected_by(id, page)
        .await
        .map_err(post_to_api)?;
    Ok(Json(posts))
}
