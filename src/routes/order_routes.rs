use axum::{routing::get, Router};

use crate::controllers::order_controller;
use crate::state::AppState;

/// Crear el router de `/api/orders`
pub fn create_order_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(order_controller::list_orders).post(order_controller::create_order),
    )
}
