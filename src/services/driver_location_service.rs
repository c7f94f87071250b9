//! Servicio de ubicación de choferes
//!
//! La última posición conocida vive en cache con TTL; cada actualización
//! se guarda además en el historial del almacén.

use chrono::Utc;
use std::sync::Arc;
use validator::Validate;

use crate::cache::{driver_location_key, CacheOperations};
use crate::dto::driver_dto::{DriverLocationUpdate, LocationAck};
use crate::models::DriverLocation;
use crate::repositories::DeliveryStore;
use crate::state::AppState;
use crate::utils::errors::{bad_request_error, not_found_error, AppResult};

pub struct DriverLocationService {
    store: Arc<dyn DeliveryStore>,
    cache: Arc<dyn CacheOperations>,
    key_prefix: String,
    ttl: u64,
}

impl DriverLocationService {
    pub fn new(store: Arc<dyn DeliveryStore>, cache: Arc<dyn CacheOperations>, key_prefix: String, ttl: u64) -> Self {
        Self {
            store,
            cache,
            key_prefix,
            ttl,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.store.clone(),
            state.cache.clone(),
            state.config.cache_key_prefix.clone(),
            state.config.driver_location_ttl,
        )
    }

    pub async fn update_driver_location(&self, driver_id: &str, update: DriverLocationUpdate) -> AppResult<LocationAck> {
        update.validate()?;
        if update.heading.map_or(false, |h| h >= 360.0) {
            return Err(bad_request_error("heading must be in [0, 360)"));
        }

        if let Some(route_id) = &update.route_id {
            if self.store.get_route(route_id).await?.is_none() {
                return Err(not_found_error("Route", route_id));
            }
        }

        let received_at = Utc::now();
        let location = DriverLocation {
            driver_id: driver_id.to_string(),
            lat: update.lat,
            lng: update.lng,
            timestamp: update.timestamp.unwrap_or(received_at),
            route_id: update.route_id,
            speed: update.speed,
            heading: update.heading,
            accuracy: update.accuracy,
        };

        self.store.record_driver_location(&location).await?;

        // El historial ya quedó guardado; un fallo del cache no debe perder la posición
        let key = driver_location_key(&self.key_prefix, driver_id);
        if let Err(e) = self.cache.set_json(&key, &location, self.ttl).await {
            log::warn!("⚠️ No se pudo cachear la posición de {}: {}", driver_id, e);
        }

        log::debug!("📍 Posición de {} actualizada ({}, {})", driver_id, location.lat, location.lng);

        Ok(LocationAck {
            success: true,
            driver_id: driver_id.to_string(),
            received_at,
        })
    }

    /// Última posición: cache primero, historial como respaldo
    pub async fn get_driver_location(&self, driver_id: &str) -> AppResult<DriverLocation> {
        let key = driver_location_key(&self.key_prefix, driver_id);
        match self.cache.get_json::<DriverLocation>(&key).await {
            Ok(Some(location)) => return Ok(location),
            Ok(None) => {}
            Err(e) => log::warn!("⚠️ Cache de posición ilegible para {}: {}", driver_id, e),
        }

        self.store
            .latest_driver_location(driver_id)
            .await?
            .ok_or_else(|| not_found_error("Driver location", driver_id))
    }
}
