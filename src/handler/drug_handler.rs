use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use std::sync::Arc;
use validator::Validate;

use crate::dto::common::MessageResponse;
use crate::dto::drug_dto::{
    CreateDrugRequest, DrugEnvelope, DrugQuery, DrugResponse, DrugStatsEnvelope, ScanDrugRequest, UpdateDrugRequest,
};
use crate::model::drug::Drug;
use crate::model::user::Actor;
use crate::service::drug_service::DrugService;
use crate::util::error::HandlerError;

fn envelope(drug: Drug) -> Json<DrugEnvelope> {
    Json(DrugEnvelope { success: true, drug: DrugResponse::from_drug(drug, Utc::now().date_naive()) })
}

pub async fn list_drugs_handler(
    State(service): State<Arc<dyn DrugService>>,
    Query(query): Query<DrugQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let res = service.list(query.filter(), query.page()).await?;
    Ok(Json(res))
}

pub async fn drug_stats_handler(State(service): State<Arc<dyn DrugService>>) -> Result<impl IntoResponse, HandlerError> {
    let stats = service.stats().await?;
    Ok(Json(DrugStatsEnvelope { success: true, stats }))
}

pub async fn get_drug_handler(
    State(service): State<Arc<dyn DrugService>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    Ok(envelope(service.get(&id).await?))
}

pub async fn create_drug_handler(
    State(service): State<Arc<dyn DrugService>>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CreateDrugRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    let drug = service.create(payload, &actor).await?;
    Ok((StatusCode::CREATED, envelope(drug)))
}

pub async fn update_drug_handler(
    State(service): State<Arc<dyn DrugService>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateDrugRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    Ok(envelope(service.update(&id, payload).await?))
}

pub async fn delete_drug_handler(
    State(service): State<Arc<dyn DrugService>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    service.delete(&id).await?;
    Ok(Json(MessageResponse::new("Drug deleted successfully")))
}

pub async fn scan_drug_handler(
    State(service): State<Arc<dyn DrugService>>,
    Json(payload): Json<ScanDrugRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    Ok(Json(service.scan(payload).await?))
}

pub async fn regenerate_qr_handler(
    State(service): State<Arc<dyn DrugService>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    Ok(envelope(service.regenerate_qr(&id).await?))
}
