use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::handler::alert_handler::{
    create_alert_handler, expiring_drugs_handler, list_alerts_handler, low_stock_handler, mark_all_read_handler,
    mark_read_handler, resolve_alert_handler,
};
use crate::middlewares::auth_middleware::{require_roles, AuthState};
use crate::model::user::Role;
use crate::service::alert_service::AlertService;
use crate::util::jwt::JwtTokenUtilsImpl;

pub fn alert_router(service: Arc<dyn AlertService>, jwt_utils: Arc<JwtTokenUtilsImpl>) -> Router {
    let authenticated = Router::new()
        .route("/alerts", get(list_alerts_handler))
        .route("/alerts/read-all", put(mark_all_read_handler))
        .route("/alerts/{id}/read", put(mark_read_handler))
        .route("/alerts/{id}/resolve", put(resolve_alert_handler))
        .route("/alerts/expiry", get(expiring_drugs_handler))
        .route("/alerts/low-stock", get(low_stock_handler))
        .route_layer(middleware::from_fn_with_state(AuthState::new(jwt_utils.clone(), &[]), require_roles));

    let admin = Router::new()
        .route("/alerts", post(create_alert_handler))
        .route_layer(middleware::from_fn_with_state(AuthState::new(jwt_utils, &[Role::Admin]), require_roles));

    authenticated.merge(admin).with_state(service)
}
