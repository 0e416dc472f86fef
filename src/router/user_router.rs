use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::handler::user_handler::{
    list_users_handler, login_handler, me_handler, refresh_token_handler, register_handler, update_profile_handler,
    UserHandlerState,
};
use crate::middlewares::auth_middleware::{require_roles, AuthState};
use crate::model::user::Role;
use crate::service::user_service::UserService;
use crate::util::jwt::JwtTokenUtilsImpl;

pub fn user_router(service: Arc<dyn UserService>, jwt_utils: Arc<JwtTokenUtilsImpl>) -> Router {
    let state = UserHandlerState { service, jwt_utils: jwt_utils.clone() };

    // Register reads an optional token itself so admins can create admins.
    let public = Router::new()
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/refresh-token", post(refresh_token_handler));

    let authenticated = Router::new()
        .route("/auth/me", get(me_handler))
        .route("/auth/profile", put(update_profile_handler))
        .route_layer(middleware::from_fn_with_state(AuthState::new(jwt_utils.clone(), &[]), require_roles));

    let staff = Router::new()
        .route("/auth/users", get(list_users_handler))
        .route_layer(middleware::from_fn_with_state(AuthState::new(jwt_utils, &Role::STAFF), require_roles));

    public.merge(authenticated).merge(staff).with_state(state)
}
