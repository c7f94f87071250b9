//! Modelo de Customer
//!
//! Clientes que reciben hielo. Las ventanas horarias son horas locales
//! del día de entrega.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::geo::GeoPoint;

/// Customer principal - mapea a la tabla customers
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub location_id: String,
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub window_start: Option<NaiveTime>,
    pub window_end: Option<NaiveTime>,
    /// Minutos de descarga en el cliente; si es None se usa el valor por defecto
    pub service_minutes: Option<i32>,
}

impl Customer {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}
