use axum::{Router, routing::get};

use crate::presentation::AppState;
use crate::presentation::http::handlers::health::{healthz, not_found};

pub(crate) mod posts;

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .merge(posts::router(state.clone()))
        .fallback(not_found)
        .with_state(state)
}
