use std::convert::Infallible;

use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::{Request, request::Parts};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics::counter;
use tracing::warn;

use crate::application::auth::AuthPrincipal;
use crate::infra::http::middleware::ClientIp;

use super::error::ApiError;
use super::state::ApiState;

/// Validate the bearer token when one is presented and stash the principal.
/// Requests without credentials pass through anonymously; handlers that need
/// an identity extract [`RequireAuth`].
pub async fn authenticate(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = extract_token(request.headers().get(axum::http::header::AUTHORIZATION));

    if let Some(token) = token {
        match state.auth.verify_token(&token) {
            Ok(principal) => {
                request.extensions_mut().insert(principal);
            }
            Err(err) => {
                counter!("calamus_auth_failure_total").increment(1);
                warn!(
                    target = "calamus::api::auth",
                    error = %err,
                    "rejected bearer token"
                );
                return ApiError::unauthorized().into_response();
            }
        }
    }

    next.run(request).await
}

pub async fn api_rate_limit(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let key = match request.extensions().get::<AuthPrincipal>() {
        Some(principal) => format!("user:{}", principal.user_id),
        None => match request.extensions().get::<ClientIp>() {
            Some(ip) => format!("ip:{}", ip.0),
            None => "anonymous".to_string(),
        },
    };

    if !state.rate_limiter.allow(&key, &path) {
        counter!("calamus_rate_limited_total").increment(1);
        return ApiError::rate_limited(state.rate_limiter.retry_after_secs());
    }

    next.run(request).await
}

/// Extractor for handlers that demand an authenticated caller.
pub struct RequireAuth(pub AuthPrincipal);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthPrincipal>()
            .copied()
            .map(RequireAuth)
            .ok_or_else(ApiError::unauthorized)
    }
}

/// Extractor for handlers that merely personalize when a caller is known.
pub struct OptionalAuth(pub Option<AuthPrincipal>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(parts.extensions.get::<AuthPrincipal>().copied()))
    }
}

/// Viewer identity used for view dedup: the account when authenticated,
/// otherwise the client address.
pub struct Fingerprint(pub String);

impl<S> FromRequestParts<S> for Fingerprint
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<AuthPrincipal>() {
            return Ok(Fingerprint(format!("user:{}", principal.user_id)));
        }
        if let Some(ip) = parts.extensions.get::<ClientIp>() {
            return Ok(Fingerprint(format!("ip:{}", ip.0)));
        }
        Ok(Fingerprint("anonymous".to_string()))
    }
}

fn extract_token(header: Option<&axum::http::HeaderValue>) -> Option<String> {
    let raw = header?.to_str().ok()?;
    let bearer = raw.strip_prefix("Bearer ")?;
    Some(bearer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_is_extracted() {
        let value = HeaderValue::from_static("Bearer abc.def.ghi");
        assert_eq!(extract_token(Some(&value)).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn non_bearer_schemes_are_ignored() {
        let value = HeaderValue::from_static("Basic dXNlcjpwdw==");
        assert_eq!(extract_token(Some(&value)), None);
        assert_eq!(extract_token(None), None);
    }
}
