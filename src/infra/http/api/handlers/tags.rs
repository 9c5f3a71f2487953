//! Tag listings, tag detail, and tag subscriptions.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::domain::types::{PostSort, SortOrder};

use super::{TagDetailQuery, tag_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::middleware::RequireAuth;
use crate::infra::http::api::state::ApiState;

pub async fn list_tags(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let tags = state.tags.list_all().await.map_err(tag_to_api)?;
    Ok(Json(tags))
}

pub async fn get_tag(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Query(query): Query<TagDetailQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::new(query.page, query.limit);
    let detail = state
        .tags
        .detail(
            id,
            query.sort.unwrap_or(PostSort::Date),
            query.order.unwrap_or(SortOrder::Desc),
            page,
        )
        .await
        .map_err(tag_to_api)?;
    Ok(Json(detail))
}

pub async fn get_tag_by_name(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = state.tags.by_name(&name).await.map_err(tag_to_api)?;
    Ok(Json(tag))
}

pub async fn subscribe_tag(
    State(state): State<ApiState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let subscription = state
        .tags
        .set_subscription(principal.user_id, id, true)
        .await
        .map_err(tag_to_api)?;
    Ok(Json(subscription))
}

pub async fn unsubscribe_tag(
    State(state): State<ApiState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let subscription = state
        .tags
        .set_subscription(principal.user_id, id, false)
        .await
        .map_err(tag_to_api)?;
    Ok(Json(subscription))
}
