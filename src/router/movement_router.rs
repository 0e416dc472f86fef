use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::handler::movement_handler::{
    assign_driver_handler, create_movement_handler, get_movement_handler, list_movements_handler,
    movement_stats_handler, scan_movement_handler, update_status_handler,
};
use crate::middlewares::auth_middleware::{require_roles, AuthState};
use crate::model::user::Role;
use crate::service::movement_service::MovementService;
use crate::util::jwt::JwtTokenUtilsImpl;

/// Per-transition role rules are enforced by the service.
pub fn movement_router(service: Arc<dyn MovementService>, jwt_utils: Arc<JwtTokenUtilsImpl>) -> Router {
    let any = Router::new()
        .route("/movements", get(list_movements_handler))
        .route("/movements/stats", get(movement_stats_handler))
        .route("/movements/{id}", get(get_movement_handler))
        .route("/movements/{id}/status", put(update_status_handler))
        .route("/movements/{id}/scan", put(scan_movement_handler))
        .route_layer(middleware::from_fn_with_state(AuthState::new(jwt_utils.clone(), &[]), require_roles));

    let staff = Router::new()
        .route("/movements", post(create_movement_handler))
        .route_layer(middleware::from_fn_with_state(AuthState::new(jwt_utils.clone(), &Role::STAFF), require_roles));

    let logistics = Router::new()
        .route("/movements/{id}/assign-driver", put(assign_driver_handler))
        .route_layer(middleware::from_fn_with_state(AuthState::new(jwt_utils, &Role::LOGISTICS), require_roles));

    any.merge(staff).merge(logistics).with_state(service)
}
