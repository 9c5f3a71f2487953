//! Threaded comments and comment likes.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::comments::CreateCommentCommand;
use crate::application::pagination::PageRequest;

use super::{PageQuery, comment_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::middleware::RequireAuth;
use crate::infra::http::api::models::{CommentCreateRequest, CommentUpdateRequest};
use crate::infra::http::api::state::ApiState;

pub async fn list_comments(
    State(state): State<ApiState>,
    Path(post_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::new(query.page, query.limit);
    let comments = state
        .comments
        .list_for_post(post_id, page)
        .await
        .map_err(comment_to_api)?;
    Ok(Json(comments))
}

pub async fn create_comment(
    State(state): State<ApiState>,
    RequireAuth(principal): RequireAuth,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CommentCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .comments
        .create(
            principal.user_id,
            post_id,
            CreateCommentCommand {
                content: payload.content,
                parent_id: payload.parent_id,
            },
        )
        .await
        .map_err(comment_to_api)?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list_replies(
    State(state): State<ApiState>,
    Path(comment_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::new(query.page, query.limit);
    let replies = state
        .comments
        .list_replies(comment_id, page)
        .await
        .map_err(comment_to_api)?;
    Ok(Json(replies))
}

pub async fn update_comment(
    State(state): State<ApiState>,
    RequireAuth(principal): RequireAuth,
    Path(comment_id): Path<Uuid>,
    Json(payload): Json<CommentUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .comments
        .update(principal.user_id, comment_id, payload.content)
        .await
        .map_err(comment_to_api)?;
    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<ApiState>,
    RequireAuth(principal): RequireAuth,
    Path(comment_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .comments
        .delete(principal.user_id, comment_id)
        .await
        .map_err(comment_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_comment(
    State(state): State<ApiState>,
    RequireAuth(principal): RequireAuth,
    Path(comment_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let like = state
        .comments
        .set_like(principal.user_id, comment_id, true)
        .await
        .map_err(comment_to_api)?;
    Ok(Json(like))
}

pub async fn unlike_comment(
    State(state): State<ApiState>,
    RequireAuth(principal): RequireAuth,
    Path(comment_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let like = state
        .comments
        .set_like(principal.user_id, comment_id, false)
        .await
        .map_err(comment_to_api)?;
    Ok(Json(like))
}
