//! Modelo de DriverLocation
//!
//! Telemetría GPS enviada por la app móvil del chofer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Última posición conocida de un chofer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DriverLocation {
    pub driver_id: String,
    pub lat: f64,
    pub lng: f64,
    pub timestamp: DateTime<Utc>,
    pub route_id: Option<String>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub accuracy: Option<f64>,
}
