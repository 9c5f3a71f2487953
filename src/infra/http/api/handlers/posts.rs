//! Post CRUD, engagement, and view tracking.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::application::posts::{CreatePostCommand, UpdatePostCommand};
use crate::application::repos::PostQueryFilter;

use super::{PostListQuery, post_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::middleware::{Fingerprint, OptionalAuth, RequireAuth};
use crate::infra::http::api::models::{PostCreateRequest, PostUpdateRequest};
use crate::infra::http::api::state::ApiState;

pub async fn list_posts(
    State(state): State<ApiState>,
    Query(query): Query<PostListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = PostQueryFilter {
        author: query.author,
        tag: query.tag,
        search: query.search,
    };
    let page = PageRequest::new(query.page, query.limit);

    let posts = state
        .posts
        .list_public(&filter, page)
        .await
        .map_err(post_to_api)?;

    Ok(Json(posts))
}

pub async fn get_post(
    State(state): State<ApiState>,
    OptionalAuth(principal): OptionalAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = principal.map(|p| p.user_id);
    let post = state
        .posts
        .get_post(viewer, id)
        .await
        .map_err(post_to_api)?;

    Ok(Json(post))
}

pub async fn create_post(
    State(state): State<ApiState>,
    RequireAuth(principal): RequireAuth,
    Json(payload): Json<PostCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CreatePostCommand {
        title: payload.title,
        content: payload.content,
        rating: payload.rating,
        status: payload.status,
        tags: payload.tags,
    };

    let post = state
        .posts
        .create_post(principal.user_id, command)
        .await
        .map_err(post_to_api)?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_post(
    State(state): State<ApiState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = UpdatePostCommand {
        title: payload.title,
        content: payload.content,
        rating: payload.rating,
        status: payload.status,
        tags: payload.tags,
    };

    let post = state
        .posts
        .update_post(principal.user_id, id, command)
        .await
        .map_err(post_to_api)?;

    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<ApiState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .posts
        .delete_post(principal.user_id, id)
        .await
        .map_err(post_to_api)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_post(
    State(state): State<ApiState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let like = state
        .posts
        .set_like(principal.user_id, id, true)
        .await
        .map_err(post_to_api)?;
    Ok(Json(like))
}

pub async fn unlike_post(
    State(state): State<ApiState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let like = state
        .posts
        .set_like(principal.user_id, id, false)
        .await
        .map_err(post_to_api)?;
    Ok(Json(like))
}

pub async fn collect_post(
    State(state): State<ApiState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let collection = state
        .posts
        .set_collection(principal.user_id, id, true)
        .await
        .map_err(post_to_api)?;
    Ok(Json(collection))
}

pub async fn uncollect_post(
    State(state): State<ApiState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let collection = state
        .posts
        .set_collection(principal.user_id, id, false)
        .await
        .map_err(post_to_api)?;
    Ok(Json(collection))
}

pub async fn record_view(
    State(state): State<ApiState>,
    Fingerprint(fingerprint): Fingerprint,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = state
        .posts
        .record_view(id, &fingerprint)
        .await
        .map_err(post_to_api)?;
    Ok(Json(receipt))
}
