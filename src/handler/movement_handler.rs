use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use validator::Validate;

use crate::dto::movement_dto::{
    AssignDriverRequest, CreateMovementRequest, MovementEnvelope, MovementQuery, MovementStatsEnvelope,
    ScanMovementRequest, UpdateStatusRequest,
};
use crate::model::movement::Movement;
use crate::model::user::Actor;
use crate::service::movement_service::MovementService;
use crate::util::error::HandlerError;

fn envelope(movement: Movement) -> Json<MovementEnvelope> {
    Json(MovementEnvelope { success: true, movement: movement.into() })
}

pub async fn list_movements_handler(
    State(service): State<Arc<dyn MovementService>>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<MovementQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let res = service.list(&actor, query.filter(), query.page()).await?;
    Ok(Json(res))
}

pub async fn movement_stats_handler(
    State(service): State<Arc<dyn MovementService>>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, HandlerError> {
    let stats = service.stats(&actor).await?;
    Ok(Json(MovementStatsEnvelope { success: true, stats }))
}

pub async fn get_movement_handler(
    State(service): State<Arc<dyn MovementService>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    Ok(envelope(service.get(&actor, &id).await?))
}

pub async fn create_movement_handler(
    State(service): State<Arc<dyn MovementService>>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CreateMovementRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    let movement = service.create(&actor, payload).await?;
    Ok((StatusCode::CREATED, envelope(movement)))
}

pub async fn update_status_handler(
    State(service): State<Arc<dyn MovementService>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    Ok(envelope(service.update_status(&actor, &id, payload).await?))
}

pub async fn scan_movement_handler(
    State(service): State<Arc<dyn MovementService>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(payload): Json<ScanMovementRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    Ok(envelope(service.scan(&actor, &id, payload).await?))
}

pub async fn assign_driver_handler(
    State(service): State<Arc<dyn MovementService>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(payload): Json<AssignDriverRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    payload.validate()?;
    Ok(envelope(service.assign_driver(&actor, &id, payload).await?))
}
