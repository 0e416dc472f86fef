use axum::{
    extract::{Json, Query, State},
    response::IntoResponse,
};
use std::sync::Arc;
use validator::Validate;

use crate::dto::report_dto::{
    ConsumptionReportQuery, DashboardEnvelope, ExpiryReportQuery, InventoryReportQuery, MovementReportQuery,
    ReportEnvelope,
};
use crate::service::report_service::ReportService;
use crate::util::error::HandlerError;

pub async fn dashboard_handler(State(service): State<Arc<dyn ReportService>>) -> Result<impl IntoResponse, HandlerError> {
    let stats = service.dashboard().await?;
    Ok(Json(DashboardEnvelope { success: true, stats }))
}

pub async fn inventory_report_handler(
    State(service): State<Arc<dyn ReportService>>,
    Query(query): Query<InventoryReportQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let report = service.inventory(query).await?;
    Ok(Json(ReportEnvelope { success: true, report }))
}

pub async fn movement_report_handler(
    State(service): State<Arc<dyn ReportService>>,
    Query(query): Query<MovementReportQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let report = service.movement(query).await?;
    Ok(Json(ReportEnvelope { success: true, report }))
}

pub async fn expiry_report_handler(
    State(service): State<Arc<dyn ReportService>>,
    Query(query): Query<ExpiryReportQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    query.validate()?;
    let report = service.expiry(query).await?;
    Ok(Json(ReportEnvelope { success: true, report }))
}

pub async fn consumption_report_handler(
    State(service): State<Arc<dyn ReportService>>,
    Query(query): Query<ConsumptionReportQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let report = service.consumption(query).await?;
    Ok(Json(ReportEnvelope { success: true, report }))
}
