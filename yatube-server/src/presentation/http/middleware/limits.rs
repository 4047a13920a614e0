use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::{BoxError, Router};
use tower::ServiceBuilder;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower::timeout::TimeoutLayer;
use tower::timeout::error::Elapsed;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::warn;

use crate::infrastructure::settings::Settings;

pub(crate) fn apply_limits(router: Router, settings: &Settings) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_limit_error))
            .layer(GlobalConcurrencyLimitLayer::new(settings.http_concurrency_limit))
            .layer(TimeoutLayer::new(Duration::from_secs(
                settings.http_request_timeout_secs,
            )))
            .layer(RequestBodyLimitLayer::new(
                settings.http_request_body_limit_bytes,
            )),
    )
}

async fn handle_limit_error(err: BoxError) -> (StatusCode, &'static str) {
    if err.is::<Elapsed>() {
        warn!("request timed out");
        return (StatusCode::REQUEST_TIMEOUT, "request timed out");
    }
    warn!(error = %err, "request rejected by middleware");
    (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
}
