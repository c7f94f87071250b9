//! Modelo de Vehicle
//!
//! Camiones refrigerados asignables a rutas.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

/// Estado del vehículo - mapea al ENUM vehicle_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "vehicle_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Available,
    InUse,
    Maintenance,
}

/// Vehicle principal - mapea a la tabla vehicles
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: String,
    pub location_id: String,
    pub name: String,
    /// Capacidad en bolsas de hielo
    pub capacity: i32,
    /// Chofer asignado por defecto
    pub driver_id: Option<String>,
    pub status: VehicleStatus,
}
