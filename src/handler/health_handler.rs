use axum::{response::IntoResponse, Json};
use chrono::Utc;

use crate::dto::common::{HealthResponse, MessageResponse};

pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse { status: "OK", timestamp: Utc::now() })
}

pub async fn root_handler() -> impl IntoResponse {
    Json(MessageResponse::new("PharmaAssure API is running"))
}
