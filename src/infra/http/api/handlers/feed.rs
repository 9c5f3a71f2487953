//! The authenticated subscription feed.

use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;

use crate::application::pagination::PageRequest;

use super::{PageQuery, feed_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::middleware::RequireAuth;
use crate::infra::http::api::state::ApiState;

pub async fn subscription_feed(
    State(state): State<ApiState>,
    RequireAuth(principal): RequireAuth,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::with_default_size(
        query.page,
        query.limit,
        state.feed.default_page_size(),
    );

    let posts = state
        .feed
        .subscription_feed(principal.user_id, page)
        .await
        .map_err(feed_to_api)?;

    Ok(Json(posts))
}
