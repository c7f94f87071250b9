//! Servicio de direcciones para el mapa
//!
//! El orden de las paradas lo decide el optimizador. Aquí solo se arma la
//! lista de puntos de paso en ese orden y, si hay token de Mapbox, se pide
//! el trazado a la Directions API, que nunca reordena los puntos.

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::dto::route_dto::{DirectionsSummary, Waypoint, WaypointKind, WaypointsResponse};
use crate::models::{Location, Route};
use crate::state::AppState;

/// Límite de coordenadas por request de la Directions API
pub const MAX_WAYPOINTS_PER_REQUEST: usize = 25;

#[derive(Debug, Deserialize)]
struct DirectionsApiResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<DirectionsApiRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsApiRoute {
    distance: f64, // metros
    duration: f64, // segundos
    geometry: Value,
}

pub struct DirectionsService {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl DirectionsService {
    pub fn new(client: Client, base_url: String, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.http_client.clone(),
            state.config.mapbox_base_url.clone(),
            state.config.mapbox_token.clone(),
        )
    }

    /// Depósito, paradas por `stop_number`, depósito
    pub fn fixed_waypoints(route: &Route, depot: &Location) -> Vec<Waypoint> {
        let depot_waypoint = Waypoint {
            kind: WaypointKind::Depot,
            stop_id: None,
            stop_number: None,
            lat: depot.latitude,
            lng: depot.longitude,
        };

        let mut stops: Vec<_> = route.stops.iter().collect();
        stops.sort_by_key(|s| s.stop_number);

        let mut waypoints = Vec::with_capacity(stops.len() + 2);
        waypoints.push(depot_waypoint.clone());
        for stop in stops {
            match stop.coordinates {
                Some(point) => waypoints.push(Waypoint {
                    kind: WaypointKind::Stop,
                    stop_id: Some(stop.id.clone()),
                    stop_number: Some(stop.stop_number),
                    lat: point.lat,
                    lng: point.lng,
                }),
                None => log::warn!("⚠️ Parada {} sin coordenadas, se omite del mapa", stop.id),
            }
        }
        waypoints.push(depot_waypoint);

        waypoints
    }

    /// Tramos consecutivos de hasta 25 puntos que comparten el punto de unión
    pub fn chunk_waypoints(waypoints: &[Waypoint]) -> Vec<&[Waypoint]> {
        if waypoints.len() < 2 {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < waypoints.len() - 1 {
            let end = (start + MAX_WAYPOINTS_PER_REQUEST).min(waypoints.len());
            chunks.push(&waypoints[start..end]);
            start = end - 1;
        }
        chunks
    }

    /// URL de la Directions API para los puntos en el orden dado
    pub fn build_directions_url(&self, waypoints: &[Waypoint], token: &str) -> String {
        let coordinates = waypoints
            .iter()
            .map(|w| format!("{:.6},{:.6}", w.lng, w.lat))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/directions/v5/mapbox/driving/{}?geometries=geojson&overview=full&access_token={}",
            self.base_url,
            coordinates,
            urlencoding::encode(token)
        )
    }

    /// Pedir el trazado; `None` si no hay token configurado
    pub async fn fetch_summary(&self, waypoints: &[Waypoint]) -> Result<Option<DirectionsSummary>> {
        let token = match &self.token {
            Some(token) => token,
            None => return Ok(None),
        };

        let mut distance_m = 0.0;
        let mut duration_s = 0.0;
        let mut coordinates: Vec<Value> = Vec::new();

        for chunk in Self::chunk_waypoints(waypoints) {
            let url = self.build_directions_url(chunk, token);
            let response = self
                .client
                .get(&url)
                .header("User-Agent", "IceDeliveryRouting/1.0")
                .send()
                .await?;

            let status = response.status();
            let response_text = response.text().await?;

            if !status.is_success() {
                return Err(anyhow!("Mapbox Directions error {}: {}", status, response_text));
            }

            let parsed: DirectionsApiResponse = serde_json::from_str(&response_text)
                .map_err(|e| anyhow!("Error parsing Mapbox Directions response: {}", e))?;

            if parsed.code != "Ok" {
                return Err(anyhow!(
                    "Mapbox Directions returned {}: {}",
                    parsed.code,
                    parsed.message.unwrap_or_default()
                ));
            }

            let route = parsed
                .routes
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("Mapbox Directions returned no routes"))?;

            distance_m += route.distance;
            duration_s += route.duration;

            if let Some(points) = route.geometry.get("coordinates").and_then(Value::as_array) {
                // El primer punto de cada tramo repite el último del anterior
                let skip = usize::from(!coordinates.is_empty());
                coordinates.extend(points.iter().skip(skip).cloned());
            }
        }

        Ok(Some(DirectionsSummary {
            distance_km: distance_m / 1000.0,
            duration_minutes: duration_s / 60.0,
            geometry: serde_json::json!({ "type": "LineString", "coordinates": coordinates }),
        }))
    }

    /// Puntos de paso de una ruta; un fallo del proveedor se registra y se omite
    pub async fn route_waypoints(&self, route: &Route, depot: &Location) -> WaypointsResponse {
        let waypoints = Self::fixed_waypoints(route, depot);

        let directions = match self.fetch_summary(&waypoints).await {
            Ok(summary) => summary,
            Err(e) => {
                log::warn!("⚠️ No se pudo obtener el trazado de la ruta {}: {}", route.id, e);
                None
            }
        };

        WaypointsResponse {
            route_id: route.id.clone(),
            optimize_waypoints: false,
            waypoints,
            directions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RouteStatus, RouteStop, StopStatus};
    use crate::utils::geo::GeoPoint;
    use chrono::{NaiveDate, Utc};

    fn depot() -> Location {
        Location {
            id: "loc_1".to_string(),
            name: "Planta".to_string(),
            latitude: 33.0,
            longitude: -112.0,
        }
    }

    fn route_with_stops(numbers: &[i32]) -> Route {
        let stops = numbers
            .iter()
            .map(|&n| RouteStop {
                id: format!("stop_{}", n),
                route_id: "r1".to_string(),
                customer_id: format!("cust_{}", n),
                order_id: format!("ord_{}", n),
                stop_number: n,
                estimated_arrival: Utc::now(),
                distance_from_previous_km: 0.0,
                status: StopStatus::Pending,
                completed_at: None,
                coordinates: Some(GeoPoint::new(33.0 + n as f64 * 0.01, -112.0)),
            })
            .collect();

        Route {
            id: "r1".to_string(),
            name: "Ruta".to_string(),
            driver_id: None,
            vehicle_id: "veh_1".to_string(),
            location_id: "loc_1".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 7, 4).unwrap(),
            estimated_duration_hours: 1.0,
            distance_km: 1.0,
            status: RouteStatus::Planned,
            stops,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_waypoints_follow_stop_number() {
        let waypoints = DirectionsService::fixed_waypoints(&route_with_stops(&[3, 1, 2]), &depot());

        assert_eq!(waypoints.len(), 5);
        assert_eq!(waypoints[0].kind, WaypointKind::Depot);
        assert_eq!(waypoints[4].kind, WaypointKind::Depot);
        let numbers: Vec<_> = waypoints[1..4].iter().map(|w| w.stop_number).collect();
        assert_eq!(numbers, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_chunks_share_joining_point() {
        let numbers: Vec<i32> = (1..=40).collect();
        let waypoints = DirectionsService::fixed_waypoints(&route_with_stops(&numbers), &depot());
        assert_eq!(waypoints.len(), 42);

        let chunks = DirectionsService::chunk_waypoints(&waypoints);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), MAX_WAYPOINTS_PER_REQUEST);
        assert_eq!(chunks[0].last(), chunks[1].first());
        assert_eq!(chunks[1].last(), waypoints.last());
    }

    #[test]
    fn test_directions_url_keeps_order() {
        let service = DirectionsService::new(Client::new(), "https://api.mapbox.com/".to_string(), None);
        let waypoints = DirectionsService::fixed_waypoints(&route_with_stops(&[1]), &depot());

        let url = service.build_directions_url(&waypoints, "pk.test");
        assert!(url.starts_with(
            "https://api.mapbox.com/directions/v5/mapbox/driving/-112.000000,33.000000;-112.000000,33.010000;"
        ));
        assert!(url.ends_with("access_token=pk.test"));
        assert!(!url.contains("optimized-trips"));
    }

    #[tokio::test]
    async fn test_without_token_directions_are_omitted() {
        let service = DirectionsService::new(Client::new(), "https://api.mapbox.com".to_string(), None);
        let response = service.route_waypoints(&route_with_stops(&[1, 2]), &depot()).await;

        assert!(!response.optimize_waypoints);
        assert!(response.directions.is_none());
        assert_eq!(response.waypoints.len(), 4);
    }
}
