use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Posición reportada por la app del chofer
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DriverLocationUpdate {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    /// Momento de la lectura en el dispositivo; si falta se usa la hora del servidor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0))]
    pub speed: Option<f64>,
    /// Grados en [0, 360)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 360.0))]
    pub heading: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0))]
    pub accuracy: Option<f64>,
}

impl DriverLocationUpdate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            timestamp: None,
            route_id: None,
            speed: None,
            heading: None,
            accuracy: None,
        }
    }
}

/// Confirmación de una actualización de posición
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationAck {
    pub success: bool,
    pub driver_id: String,
    pub received_at: DateTime<Utc>,
}
