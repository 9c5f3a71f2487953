//! API handlers organized by resource type.
//!
//! Each submodule contains handlers for a specific resource (auth, posts,
//! users, …). Helper functions for query parsing and error conversion are
//! defined here and shared across modules.

mod auth;
mod comments;
mod feed;
mod posts;
mod search;
mod tags;
mod users;

pub use auth::*;
pub use comments::*;
pub use feed::*;
pub use posts::*;
pub use search::*;
pub use tags::*;
pub use users::*;

// ----- Shared query structs -----

use serde::Deserialize;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, Time};
use uuid::Uuid;

use crate::domain::types::{PostSort, SearchKind, SearchSort, SortOrder};

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PostListQuery {
    pub author: Option<Uuid>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct TagDetailQuery {
    pub sort: Option<PostSort>,
    pub order: Option<SortOrder>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(rename = "type")]
    pub kind: Option<SearchKind>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub sort: Option<SearchSort>,
    pub order: Option<SortOrder>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Parse a `YYYY-MM-DD` bound into the start of that day (UTC).
pub(crate) fn parse_date_floor(value: &str) -> Result<OffsetDateTime, ApiError> {
    let date = Date::parse(value, DATE_FORMAT)
        .map_err(|err| ApiError::bad_request("invalid date filter", Some(err.to_string())))?;
    Ok(date.with_time(Time::MIDNIGHT).assume_utc())
}

/// Parse a `YYYY-MM-DD` bound into the end of that day (exclusive upper edge
/// pulled back inside the day).
pub(crate) fn parse_date_ceiling(value: &str) -> Result<OffsetDateTime, ApiError> {
    Ok(parse_date_floor(value)? + Duration::days(1) - Duration::nanoseconds(1))
}

// ----- Shared error conversions -----

use axum::http::StatusCode;

use crate::application::auth::AuthError;
use crate::application::comments::CommentError;
use crate::application::feed::FeedError;
use crate::application::posts::PostError;
use crate::application::repos::RepoError;
use crate::application::search::SearchError;
use crate::application::tags::TagError;
use crate::application::users::UserError;
use crate::domain::error::DomainError;

use super::error::{ApiError, codes};

pub(crate) fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Duplicate record",
            Some(constraint),
        ),
        RepoError::NotFound => ApiError::not_found("resource not found"),
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
        RepoError::Integrity { message } => ApiError::new(
            StatusCode::CONFLICT,
            codes::INTEGRITY,
            "Integrity constraint violated",
            Some(message),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        ),
        RepoError::Persistence(message) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Storage failure",
            Some(message),
        ),
    }
}

pub(crate) fn auth_to_api(err: AuthError) -> ApiError {
    match err {
        AuthError::Repo(repo) => repo_to_api(repo),
        AuthError::InvalidCredentials => ApiError::invalid_credentials(),
        AuthError::EmailTaken => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Email already registered",
            None,
        ),
        AuthError::UsernameTaken => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Username already taken",
            None,
        ),
        AuthError::Validation(message) => ApiError::bad_request(message, None),
        AuthError::Hash(detail) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::AUTH,
            "Credential processing failed",
            Some(detail),
        ),
        AuthError::Token(err) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::AUTH,
            "Token processing failed",
            Some(err.to_string()),
        ),
    }
}

pub(crate) fn user_to_api(err: UserError) -> ApiError {
    match err {
        UserError::Repo(repo) => repo_to_api(repo),
        UserError::NotFound => ApiError::not_found("user not found"),
        UserError::UsernameTaken => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Username already taken",
            None,
        ),
        UserError::SelfFollow => ApiError::bad_request("cannot follow yourself", None),
        UserError::Validation(message) => ApiError::bad_request(message, None),
    }
}

pub(crate) fn post_to_api(err: PostError) -> ApiError {
    match err {
        PostError::Repo(repo) => repo_to_api(repo),
        PostError::Domain(domain) => domain_to_api(domain),
        PostError::NotFound => ApiError::not_found("post not found"),
        PostError::Forbidden => ApiError::forbidden("only the author may modify this post"),
    }
}

pub(crate) fn domain_to_api(err: DomainError) -> ApiError {
    match err {
        DomainError::NotFound(_) => ApiError::not_found("resource not found"),
        DomainError::Validation(message) => ApiError::bad_request(message, None),
        DomainError::Invariant(detail) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::INTEGRITY,
            "Invariant violated",
            Some(detail),
        ),
    }
}

pub(crate) fn comment_to_api(err: CommentError) -> ApiError {
    match err {
        CommentError::Repo(repo) => repo_to_api(repo),
        CommentError::NotFound => ApiError::not_found("comment not found"),
        CommentError::PostNotFound => ApiError::not_found("post not found"),
        CommentError::ParentMismatch => {
            ApiError::bad_request("parent comment does not belong to this post", None)
        }
        CommentError::Forbidden => ApiError::forbidden("only the author may modify this comment"),
        CommentError::Validation(message) => ApiError::bad_request(message, None),
    }
}

pub(crate) fn tag_to_api(err: TagError) -> ApiError {
    match err {
        TagError::Repo(repo) => repo_to_api(repo),
        TagError::NotFound => ApiError::not_found("tag not found"),
    }
}

pub(crate) fn feed_to_api(err: FeedError) -> ApiError {
    match err {
        FeedError::Repo(repo) => repo_to_api(repo),
    }
}

pub(crate) fn search_to_api(err: SearchError) -> ApiError {
    match err {
        SearchError::Repo(repo) => repo_to_api(repo),
        SearchError::EmptyQuery => ApiError::bad_request("search query must not be empty", None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_bounds_cover_the_whole_day() {
        let floor = parse_date_floor("2024-06-01").expect("floor");
        let ceiling = parse_date_ceiling("2024-06-01").expect("ceiling");
        assert_eq!(floor.date().to_string(), "2024-06-01");
        assert_eq!(ceiling.date().to_string(), "2024-06-01");
        assert!(ceiling > floor);
    }

    #[test]
    fn malformed_dates_are_rejected() {
        assert!(parse_date_floor("June 1st").is_err());
        assert!(parse_date_floor("2024-13-40").is_err());
    }
}
