use axum::Router;
use axum::http::Request;
use tower_http::trace::TraceLayer;
use tracing::info_span;

pub(crate) fn apply_trace(router: Router) -> Router {
    router.layer(
        TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
            info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
            )
        }),
    )
}
