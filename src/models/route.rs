//! Modelo de Route
//!
//! Este módulo contiene el struct Route, sus paradas y las reglas de
//! transición de estado. Las rutas las crea el optimizador.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;

use crate::utils::geo::{round_to, GeoPoint};

/// Estado de la ruta - mapea al ENUM route_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "route_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
    Planned,
    Active,
    Completed,
    Cancelled,
}

impl RouteStatus {
    /// planned -> active -> completed, y planned|active -> cancelled
    pub fn can_transition_to(self, next: RouteStatus) -> bool {
        matches!(
            (self, next),
            (RouteStatus::Planned, RouteStatus::Active)
                | (RouteStatus::Active, RouteStatus::Completed)
                | (RouteStatus::Planned, RouteStatus::Cancelled)
                | (RouteStatus::Active, RouteStatus::Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RouteStatus::Completed | RouteStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RouteStatus::Planned => "planned",
            RouteStatus::Active => "active",
            RouteStatus::Completed => "completed",
            RouteStatus::Cancelled => "cancelled",
        }
    }
}

/// Estado de la parada - mapea al ENUM stop_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "stop_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StopStatus {
    Pending,
    Completed,
}

/// Parada de una ruta. `stop_number` empieza en 1 y es contiguo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteStop {
    pub id: String,
    pub route_id: String,
    pub customer_id: String,
    pub order_id: String,
    pub stop_number: i32,
    pub estimated_arrival: DateTime<Utc>,
    #[serde(default)]
    pub distance_from_previous_km: f64,
    pub status: StopStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<GeoPoint>,
}

/// Route principal con sus paradas ordenadas por `stop_number`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    pub id: String,
    pub name: String,
    pub driver_id: Option<String>,
    pub vehicle_id: String,
    pub location_id: String,
    pub date: NaiveDate,
    pub estimated_duration_hours: f64,
    #[serde(default)]
    pub distance_km: f64,
    pub status: RouteStatus,
    pub stops: Vec<RouteStop>,
    pub created_at: DateTime<Utc>,
}

impl Route {
    pub fn completed_stops(&self) -> usize {
        self.stops
            .iter()
            .filter(|s| s.status == StopStatus::Completed)
            .count()
    }

    pub fn all_stops_completed(&self) -> bool {
        self.completed_stops() == self.stops.len()
    }

    pub fn find_stop(&self, stop_id: &str) -> Option<&RouteStop> {
        self.stops.iter().find(|s| s.id == stop_id)
    }

    /// Siguiente parada pendiente en el orden asignado
    pub fn next_stop(&self) -> Option<&RouteStop> {
        self.stops
            .iter()
            .filter(|s| s.status == StopStatus::Pending)
            .min_by_key(|s| s.stop_number)
    }
}

/// Avance de una ruta: paradas completadas vs. totales
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteProgress {
    pub route_id: String,
    pub status: RouteStatus,
    pub total_stops: usize,
    pub completed_stops: usize,
    pub remaining_stops: usize,
    pub percent_complete: f64,
    pub next_stop: Option<RouteStop>,
}

impl From<&Route> for RouteProgress {
    fn from(route: &Route) -> Self {
        let total_stops = route.stops.len();
        let completed_stops = route.completed_stops();
        let percent_complete = if total_stops == 0 {
            0.0
        } else {
            round_to(completed_stops as f64 * 100.0 / total_stops as f64, 1)
        };

        Self {
            route_id: route.id.clone(),
            status: route.status,
            total_stops,
            completed_stops,
            remaining_stops: total_stops - completed_stops,
            percent_complete,
            next_stop: route.next_stop().cloned(),
        }
    }
}

/// Filtros para búsqueda de rutas
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RouteFilters {
    pub location_id: Option<String>,
    pub status: Option<RouteStatus>,
    pub date: Option<NaiveDate>,
    pub driver_id: Option<String>,
}

impl RouteFilters {
    pub fn matches(&self, route: &Route) -> bool {
        self.location_id.as_ref().map_or(true, |l| &route.location_id == l)
            && self.status.map_or(true, |s| route.status == s)
            && self.date.map_or(true, |d| route.date == d)
            && self
                .driver_id
                .as_ref()
                .map_or(true, |d| route.driver_id.as_ref() == Some(d))
    }
}
