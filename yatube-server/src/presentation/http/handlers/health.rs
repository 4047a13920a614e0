use axum::Json;
use serde::Serialize;

use crate::presentation::http::app_error::AppError;

#[derive(Debug, Serialize)]
pub(crate) struct HealthzResponse {
    status: &'static str,
}

pub(crate) async fn healthz() -> Json<HealthzResponse> {
    Json(HealthzResponse { status: "ok" })
}

pub(crate) async fn not_found() -> AppError {
    AppError::NotFound
}
