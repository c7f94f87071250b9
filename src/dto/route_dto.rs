//! DTOs de rutas
//!
//! Este módulo define las estructuras de entrada y salida de los endpoints
//! de optimización y seguimiento de rutas.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::route::{Route, RouteStatus};
use crate::optimizer::UnassignedReason;
use crate::utils::validation::validate_identifier;

/// Parámetros de query de `POST /api/routes/optimize`
#[derive(Debug, Default, Clone, Deserialize)]
pub struct OptimizeQuery {
    pub location_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub vehicle_count: Option<u32>,
}

/// Referencia a un pedido dentro de una solicitud de optimización
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderRef {
    pub id: String,
    pub customer_id: String,
    pub quantity: i32,
}

/// Request de optimización (forma con cuerpo JSON)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OptimizeRouteRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orders: Option<Vec<OrderRef>>,
    #[validate(custom = "validate_identifier")]
    pub location_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 100))]
    pub vehicle_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

impl OptimizeRouteRequest {
    /// Solicitud simple: todos los pedidos pendientes de la ubicación
    pub fn for_location(location_id: impl Into<String>) -> Self {
        Self {
            orders: None,
            location_id: location_id.into(),
            vehicle_count: None,
            date: None,
        }
    }
}

/// Pedido que no pudo asignarse a ninguna ruta
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnassignedOrder {
    pub order_id: String,
    pub customer_id: String,
    pub reason: UnassignedReason,
}

/// Resultado de la optimización
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeRouteResponse {
    pub routes: Vec<Route>,
    pub message: String,
    #[serde(default)]
    pub unassigned: Vec<UnassignedOrder>,
    #[serde(default)]
    pub total_distance_km: f64,
    #[serde(default)]
    pub total_duration_hours: f64,
    #[serde(default)]
    pub orders_considered: usize,
}

impl OptimizeRouteResponse {
    /// Resultado neutro cuando no hay nada que planificar
    pub fn empty(message: String) -> Self {
        Self {
            routes: Vec::new(),
            message,
            unassigned: Vec::new(),
            total_distance_km: 0.0,
            total_duration_hours: 0.0,
            orders_considered: 0,
        }
    }

    pub fn total_stops(&self) -> usize {
        self.routes.iter().map(|r| r.stops.len()).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRouteStatusRequest {
    pub status: RouteStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WaypointKind {
    Depot,
    Stop,
}

/// Punto de paso en el orden fijado por el backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Waypoint {
    pub kind: WaypointKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_number: Option<i32>,
    pub lat: f64,
    pub lng: f64,
}

/// Resumen del trazado devuelto por el proveedor de direcciones
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionsSummary {
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub geometry: serde_json::Value,
}

/// Respuesta de `GET /api/routes/:id/waypoints`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaypointsResponse {
    pub route_id: String,
    /// Siempre `false`: el mapa no debe reordenar las paradas
    pub optimize_waypoints: bool,
    pub waypoints: Vec<Waypoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directions: Option<DirectionsSummary>,
}
