mod cors;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use sanctum_core::AppError;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState, frontend_url: &str) -> Result<Router, AppError> {
    let protected_routes = Router::new()
        .route(
            "/api/me/permissions",
            get(handlers::permissions::my_permissions_handler),
        )
        .route(
            "/api/roles",
            get(handlers::roles::list_roles_handler).post(handlers::roles::create_role_handler),
        )
        .route(
            "/api/users/{user_id}/roles",
            get(handlers::roles::list_user_roles_handler)
                .post(handlers::roles::assign_user_role_handler),
        )
        .route(
            "/api/users/{user_id}/roles/{role_id}",
            delete(handlers::roles::deactivate_user_role_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_auth,
        ));

    let assist_routes = Router::new()
        .route("/api/assist", post(handlers::assist::assist_handler))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::resolve_request_context,
        ));

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(assist_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors::build_cors_layer(frontend_url)?)
        .with_state(app_state))
}
