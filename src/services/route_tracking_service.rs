//! Servicio de seguimiento de rutas
//!
//! Consulta de rutas, progreso, transiciones de estado y cierre de paradas.

use chrono::Utc;
use std::sync::Arc;

use crate::middleware::auth::AuthenticatedUser;
use crate::models::{Route, RouteFilters, RouteProgress, RouteStatus};
use crate::repositories::DeliveryStore;
use crate::utils::errors::{forbidden_error, not_found_error, AppError, AppResult};

pub struct RouteTrackingService {
    store: Arc<dyn DeliveryStore>,
}

impl RouteTrackingService {
    pub fn new(store: Arc<dyn DeliveryStore>) -> Self {
        Self { store }
    }

    pub async fn list_routes(&self, filters: &RouteFilters) -> AppResult<Vec<Route>> {
        self.store.list_routes(filters).await
    }

    pub async fn get_route(&self, route_id: &str) -> AppResult<Route> {
        self.store
            .get_route(route_id)
            .await?
            .ok_or_else(|| not_found_error("Route", route_id))
    }

    pub async fn get_route_progress(&self, route_id: &str) -> AppResult<RouteProgress> {
        let route = self.get_route(route_id).await?;
        Ok(RouteProgress::from(&route))
    }

    /// Aplicar una transición de estado válida
    pub async fn update_route_status(&self, route_id: &str, next: RouteStatus) -> AppResult<Route> {
        let route = self.get_route(route_id).await?;

        if !route.status.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "Route '{}' cannot go from '{}' to '{}'",
                route_id,
                route.status.as_str(),
                next.as_str()
            )));
        }

        if next == RouteStatus::Completed && !route.all_stops_completed() {
            return Err(AppError::Conflict(format!(
                "Route '{}' still has {} pending stops",
                route_id,
                route.stops.len() - route.completed_stops()
            )));
        }

        let updated = self.store.update_route_status(route_id, route.status, next).await?;
        log::info!(
            "🔄 Ruta {}: {} → {}",
            route_id,
            route.status.as_str(),
            updated.status.as_str()
        );

        Ok(updated)
    }

    /// Completar una parada; los choferes solo pueden cerrar paradas de sus rutas
    pub async fn complete_stop(&self, user: &AuthenticatedUser, route_id: &str, stop_id: &str) -> AppResult<Route> {
        let route = self.get_route(route_id).await?;

        if !user.is_manager() {
            let owns_route = route.driver_id.as_deref().map_or(false, |d| user.can_act_as_driver(d));
            if !owns_route {
                return Err(forbidden_error("complete stop", "route is assigned to another driver"));
            }
        }

        let updated = self.store.complete_stop(route_id, stop_id, Utc::now()).await?;
        log::info!(
            "📦 Parada {} completada ({}/{}) en ruta {}",
            stop_id,
            updated.completed_stops(),
            updated.stops.len(),
            route_id
        );

        Ok(updated)
    }
}
