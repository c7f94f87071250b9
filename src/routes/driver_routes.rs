use axum::{routing::get, Router};

use crate::controllers::driver_controller;
use crate::state::AppState;

/// Crear el router de `/api/drivers`
pub fn create_driver_routes() -> Router<AppState> {
    Router::new().route(
        "/:id/location",
        get(driver_controller::get_driver_location).post(driver_controller::update_driver_location),
    )
}
