use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use crate::presentation::AppState;
use crate::presentation::http::app_error::AppError;

#[derive(Debug, Clone)]
pub(crate) struct AuthenticatedUser {
    pub(crate) user_id: i64,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// Lets authenticated requests through; sends everyone else to the login page
/// with the requested target in `next`.
pub(crate) async fn login_required(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let claims =
        bearer_token(request.headers()).and_then(|token| state.jwt.verify_token(token).ok());

    let Some(claims) = claims else {
        let next_path = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        debug!(next_path, "anonymous request redirected to login");
        return Redirect::to(&login_redirect_url(&state.login_url, next_path)).into_response();
    };

    request.extensions_mut().insert(AuthenticatedUser {
        user_id: claims.user_id,
    });

    next.run(request).await
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;

    let mut parts = raw.split_whitespace();
    let scheme = parts.next()?;
    let token = parts.next()?;
    if parts.next().is_some() || !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    Some(token)
}

pub(crate) fn login_redirect_url(login_url: &str, target: &str) -> String {
    let target = urlencoding::encode(target).replace("%2F", "/");
    let separator = if login_url.contains('?') { '&' } else { '?' };
    format!("{login_url}{separator}next={target}")
}
