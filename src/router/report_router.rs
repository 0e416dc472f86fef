use axum::{middleware, routing::get, Router};
use std::sync::Arc;

use crate::handler::report_handler::{
    consumption_report_handler, dashboard_handler, expiry_report_handler, inventory_report_handler,
    movement_report_handler,
};
use crate::middlewares::auth_middleware::{require_roles, AuthState};
use crate::model::user::Role;
use crate::service::report_service::ReportService;
use crate::util::jwt::JwtTokenUtilsImpl;

pub fn report_router(service: Arc<dyn ReportService>, jwt_utils: Arc<JwtTokenUtilsImpl>) -> Router {
    Router::new()
        .route("/reports/dashboard", get(dashboard_handler))
        .route("/reports/inventory", get(inventory_report_handler))
        .route("/reports/movement", get(movement_report_handler))
        .route("/reports/expiry", get(expiry_report_handler))
        .route("/reports/consumption", get(consumption_report_handler))
        .route_layer(middleware::from_fn_with_state(AuthState::new(jwt_utils, &Role::STAFF), require_roles))
        .with_state(service)
}
