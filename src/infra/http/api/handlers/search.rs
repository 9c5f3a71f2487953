//! Combined and scoped search.

use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;

use crate::application::pagination::PageRequest;
use crate::application::repos::SearchFilter;
use crate::domain::types::{SearchKind, SearchSort, SortOrder};

use super::{SearchQuery, parse_date_ceiling, parse_date_floor, search_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

pub async fn search(
    State(state): State<ApiState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let date_from = query
        .date_from
        .as_deref()
        .map(parse_date_floor)
        .transpose()?;
    let date_to = query
        .date_to
        .as_deref()
        .map(parse_date_ceiling)
        .transpose()?;

    let filter = SearchFilter {
        query: query.q,
        date_from,
        date_to,
        sort: query.sort.unwrap_or(SearchSort::Relevance),
        order: query.order.unwrap_or(SortOrder::Desc),
    };
    let page = PageRequest::new(query.page, query.limit);

    let results = state
        .search
        .search(query.kind.unwrap_or(SearchKind::All), &filter, page)
        .await
        .map_err(search_to_api)?;

    Ok(Json(results))
}
