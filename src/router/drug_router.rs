use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::handler::drug_handler::{
    create_drug_handler, delete_drug_handler, drug_stats_handler, get_drug_handler, list_drugs_handler,
    regenerate_qr_handler, scan_drug_handler, update_drug_handler,
};
use crate::middlewares::auth_middleware::{require_roles, AuthState};
use crate::model::user::Role;
use crate::service::drug_service::DrugService;
use crate::util::jwt::JwtTokenUtilsImpl;

pub fn drug_router(service: Arc<dyn DrugService>, jwt_utils: Arc<JwtTokenUtilsImpl>) -> Router {
    let read = Router::new()
        .route("/drugs", get(list_drugs_handler))
        .route("/drugs/stats", get(drug_stats_handler))
        .route("/drugs/{id}", get(get_drug_handler))
        .route("/drugs/scan", post(scan_drug_handler))
        .route_layer(middleware::from_fn_with_state(AuthState::new(jwt_utils.clone(), &[]), require_roles));

    let staff = Router::new()
        .route("/drugs", post(create_drug_handler))
        .route("/drugs/{id}", put(update_drug_handler))
        .route("/drugs/{id}/regenerate-qr", post(regenerate_qr_handler))
        .route_layer(middleware::from_fn_with_state(AuthState::new(jwt_utils.clone(), &Role::STAFF), require_roles));

    let admin = Router::new()
        .route("/drugs/{id}", delete(delete_drug_handler))
        .route_layer(middleware::from_fn_with_state(AuthState::new(jwt_utils, &[Role::Admin]), require_roles));

    read.merge(staff).merge(admin).with_state(service)
}
