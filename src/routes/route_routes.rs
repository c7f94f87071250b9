//! Rutas de optimización y seguimiento de rutas de reparto

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::controllers::route_controller;
use crate::middleware::rate_limit::rate_limit_middleware;
use crate::state::AppState;

/// Crear el router de `/api/routes`
pub fn create_route_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/optimize",
            post(route_controller::optimize_routes)
                .route_layer(middleware::from_fn_with_state(state, rate_limit_middleware)),
        )
        .route("/", get(route_controller::list_routes))
        .route("/:id", get(route_controller::get_route))
        .route("/:id/progress", get(route_controller::get_route_progress))
        .route("/:id/status", patch(route_controller::update_route_status))
        .route("/:id/stops/:stop_id/complete", post(route_controller::complete_stop))
        .route("/:id/waypoints", get(route_controller::get_route_waypoints))
}
