use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, post},
    Router,
};
use std::sync::Arc;

use crate::config::UploadConfig;
use crate::handler::upload_handler::{delete_upload_handler, upload_multiple_handler, upload_single_handler};
use crate::middlewares::auth_middleware::{require_roles, AuthState};
use crate::model::user::Role;
use crate::service::upload_service::UploadService;
use crate::util::jwt::JwtTokenUtilsImpl;

/// Room for multipart boundaries and part headers on top of the file bytes.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn upload_router(service: Arc<dyn UploadService>, jwt_utils: Arc<JwtTokenUtilsImpl>, config: &UploadConfig) -> Router {
    let single_limit = config.max_bytes + MULTIPART_OVERHEAD;
    let multiple_limit = config.max_bytes * config.max_files + MULTIPART_OVERHEAD;

    Router::new()
        .route("/upload/single", post(upload_single_handler).layer(DefaultBodyLimit::max(single_limit)))
        .route("/upload/multiple", post(upload_multiple_handler).layer(DefaultBodyLimit::max(multiple_limit)))
        .route("/upload/{public_id}", delete(delete_upload_handler))
        .route_layer(middleware::from_fn_with_state(AuthState::new(jwt_utils, &Role::STAFF), require_roles))
        .with_state(service)
}
