use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use std::sync::Arc;
use validator::Validate;

use crate::dto::alert_dto::{AlertEnvelope, AlertQuery, CreateAlertRequest, ExpiryQuery, DEFAULT_EXPIRY_WINDOW_DAYS};
use crate::dto::common::MessageResponse;
use crate::dto::drug_dto::{DrugResponse, DrugsEnvelope};
use crate::model::user::Actor;
use crate::service::alert_service::AlertService;
use crate::util::error::HandlerError;

pub async fn list_alerts_handler(
    State(service): State<Arc<dyn AlertService>>,
    Query(query): Query<AlertQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    Ok(Json(service.list(query.filter(), query.page()).await?))
}

pub async fn mark_read_handler(
    State(service): State<Arc<dyn AlertService>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let alert = service.mark_read(&id).await?;
    Ok(Json(AlertEnvelope { success: true, alert: alert.into() }))
}

pub async fn mark_all_read_handler(State(service): State<Arc<dyn AlertService>>) -> Result<impl IntoResponse, HandlerError> {
    let modified = service.mark_all_read().await?;
    Ok(Json(MessageResponse::new(format!("{} alerts marked as read", modified))))
}

pub async fn resolve_alert_handler(
    State(service): State<Arc<dyn AlertService>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let alert = service.resolve(&id, &actor).await?;
    Ok(Json(AlertEnvelope { success: true, alert: alert.into() }))
}

pub async fn expiring_drugs_handler(
    State(service): State<Arc<dyn AlertService>>,
    Query(query): Query<ExpiryQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    query.validate()?;
    let drugs = service.expiring_drugs(query.days.unwrap_or(DEFAULT_EXPIRY_WINDOW_DAYS)).await?;
    let drugs = DrugResponse::from_drugs(drugs, Utc::now().date_naive());
    Ok(Json(DrugsEnvelope { success: true, count: drugs.len(), drugs }))
}

pub async fn low_stock_handler(State(service): State<Arc<dyn AlertService>>) -> Result<impl IntoResponse, HandlerError> {
    let drugs = DrugResponse::from_drugs(service.low_stock_drugs().await?, Utc::now().date_naive());
    Ok(Json(DrugsEnvelope { success: true, count: drugs.len(), drugs }))
}

pub async fn create_alert_handler(
    State(service): State<Arc<dyn AlertService>>,
    Json(payload): Json<CreateAlertRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    let alert = service.create_manual(payload).await?;
    Ok((StatusCode::CREATED, Json(AlertEnvelope { success: true, alert: alert.into() })))
}
