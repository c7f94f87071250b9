//! Modelo de Location
//!
//! Plantas y centros de distribución desde donde salen los vehículos.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::geo::GeoPoint;

/// Location principal - mapea a la tabla locations
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}
