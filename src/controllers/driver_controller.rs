//! Controlador de choferes
//!
//! Posición en tiempo real de los choferes.

use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};

use crate::dto::driver_dto::{DriverLocationUpdate, LocationAck};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::DriverLocation;
use crate::services::DriverLocationService;
use crate::state::AppState;
use crate::utils::errors::{forbidden_error, AppError};

/// Reportar la posición de un chofer (gerentes o el propio chofer)
pub async fn update_driver_location(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(driver_id): Path<String>,
    Json(update): Json<DriverLocationUpdate>,
) -> Result<Json<LocationAck>, AppError> {
    if !user.can_act_as_driver(&driver_id) {
        return Err(forbidden_error("update driver location", "only the driver or a manager may report it"));
    }

    let ack = DriverLocationService::from_state(&state)
        .update_driver_location(&driver_id, update)
        .await?;
    state.metrics.driver_location_updates.inc();

    Ok(Json(ack))
}

/// Última posición conocida
pub async fn get_driver_location(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
) -> Result<Json<DriverLocation>, AppError> {
    let location = DriverLocationService::from_state(&state)
        .get_driver_location(&driver_id)
        .await?;
    Ok(Json(location))
}
