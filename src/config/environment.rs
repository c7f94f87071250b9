//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno. La configuración se
//! construye una sola vez al arrancar y se pasa explícitamente al estado
//! de la aplicación.

use chrono::NaiveTime;
use std::env;
use std::str::FromStr;
use thiserror::Error;

use crate::optimizer::OptimizerSettings;

const DEV_JWT_SECRET: &str = "dev-only-secret-change-me";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub log_level: String,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub cache_key_prefix: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub cors_origins: Vec<String>,
    pub rate_limit_requests: u32,
    pub rate_limit_window: u64,
    pub mapbox_token: Option<String>,
    pub mapbox_base_url: String,
    pub driver_location_ttl: u64,
    pub shift_start: NaiveTime,
    pub optimizer: OptimizerSettings,
    /// Contraseña de los usuarios de demostración del almacén en memoria
    pub demo_password: Option<String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            log_level: "debug".to_string(),
            database_url: None,
            redis_url: None,
            cache_key_prefix: "ice_delivery".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expiration: 86_400,
            cors_origins: Vec::new(),
            rate_limit_requests: 60,
            rate_limit_window: 60,
            mapbox_token: None,
            mapbox_base_url: "https://api.mapbox.com".to_string(),
            driver_location_ttl: 3600,
            shift_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            optimizer: OptimizerSettings::default(),
            demo_password: None,
        }
    }
}

impl EnvironmentConfig {
    /// Leer la configuración de las variables de entorno del proceso
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Construir la configuración a partir de una función de búsqueda
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let environment = get("ENVIRONMENT").unwrap_or(defaults.environment);
        let is_production = environment == "production";

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None if is_production => return Err(ConfigError::Missing("JWT_SECRET")),
            None => defaults.jwt_secret,
        };

        let default_log_level = if is_production { "info".to_string() } else { defaults.log_level };

        let optimizer = OptimizerSettings {
            average_speed_kmh: parse_or(&get, "OPTIMIZER_AVERAGE_SPEED_KMH", defaults.optimizer.average_speed_kmh)?,
            default_service_minutes: parse_or(
                &get,
                "OPTIMIZER_SERVICE_MINUTES",
                defaults.optimizer.default_service_minutes,
            )?,
            max_shift_minutes: parse_or(&get, "OPTIMIZER_MAX_SHIFT_HOURS", defaults.optimizer.max_shift_minutes / 60.0)?
                * 60.0,
            vehicle_cost_km: parse_or(&get, "OPTIMIZER_VEHICLE_COST_KM", defaults.optimizer.vehicle_cost_km)?,
            local_search_rounds: parse_or(
                &get,
                "OPTIMIZER_LOCAL_SEARCH_ROUNDS",
                defaults.optimizer.local_search_rounds,
            )?,
        };

        if !(optimizer.average_speed_kmh.is_finite() && optimizer.average_speed_kmh > 0.0) {
            return Err(ConfigError::Invalid {
                key: "OPTIMIZER_AVERAGE_SPEED_KMH",
                value: optimizer.average_speed_kmh.to_string(),
            });
        }

        let shift_start = match get("OPTIMIZER_SHIFT_START") {
            Some(value) => NaiveTime::parse_from_str(&value, "%H:%M").map_err(|_| ConfigError::Invalid {
                key: "OPTIMIZER_SHIFT_START",
                value,
            })?,
            None => defaults.shift_start,
        };

        Ok(Self {
            port: parse_or(&get, "PORT", defaults.port)?,
            host: get("HOST").unwrap_or(defaults.host),
            log_level: get("LOG_LEVEL").unwrap_or(default_log_level),
            database_url: get("DATABASE_URL"),
            redis_url: get("REDIS_URL"),
            cache_key_prefix: get("CACHE_KEY_PREFIX").unwrap_or(defaults.cache_key_prefix),
            jwt_secret,
            jwt_expiration: parse_or(&get, "JWT_EXPIRATION", defaults.jwt_expiration)?,
            cors_origins: get("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            rate_limit_requests: parse_or(&get, "RATE_LIMIT_REQUESTS", defaults.rate_limit_requests)?,
            rate_limit_window: parse_or(&get, "RATE_LIMIT_WINDOW", defaults.rate_limit_window)?,
            mapbox_token: get("MAPBOX_TOKEN"),
            mapbox_base_url: get("MAPBOX_BASE_URL").unwrap_or(defaults.mapbox_base_url),
            driver_location_ttl: parse_or(&get, "DRIVER_LOCATION_TTL", defaults.driver_location_ttl)?,
            shift_start,
            optimizer,
            demo_password: get("DEMO_PASSWORD"),
            environment,
        })
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_in_development() {
        let config = EnvironmentConfig::from_lookup(lookup(&[])).unwrap();

        assert!(config.is_development());
        assert_eq!(config.port, 3000);
        assert!(config.database_url.is_none());
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.optimizer.max_shift_minutes, 600.0);
        assert_eq!(config.shift_start, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
    }

    #[test]
    fn test_production_requires_jwt_secret() {
        let result = EnvironmentConfig::from_lookup(lookup(&[("ENVIRONMENT", "production")]));
        assert!(matches!(result, Err(ConfigError::Missing("JWT_SECRET"))));

        let config = EnvironmentConfig::from_lookup(lookup(&[
            ("ENVIRONMENT", "production"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .unwrap();
        assert!(config.is_production());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_parses_values() {
        let config = EnvironmentConfig::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("CORS_ORIGINS", "https://a.example, https://b.example,"),
            ("OPTIMIZER_MAX_SHIFT_HOURS", "8"),
            ("OPTIMIZER_SHIFT_START", "06:30"),
            ("DATABASE_URL", "postgres://ice@localhost/ice"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.cors_origins.len(), 2);
        assert_eq!(config.optimizer.max_shift_minutes, 480.0);
        assert_eq!(config.shift_start, NaiveTime::from_hms_opt(6, 30, 0).unwrap());
        assert_eq!(config.server_url(), "0.0.0.0:8080");
        assert!(config.database_url.is_some());
    }

    #[test]
    fn test_rejects_invalid_numbers() {
        let result = EnvironmentConfig::from_lookup(lookup(&[("PORT", "not-a-port")]));
        assert!(matches!(result, Err(ConfigError::Invalid { key: "PORT", .. })));

        let result = EnvironmentConfig::from_lookup(lookup(&[("OPTIMIZER_AVERAGE_SPEED_KMH", "0")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_non_finite_speed() {
        for value in ["NaN", "inf", "-inf"] {
            let result = EnvironmentConfig::from_lookup(lookup(&[("OPTIMIZER_AVERAGE_SPEED_KMH", value)]));
            assert!(
                matches!(result, Err(ConfigError::Invalid { key: "OPTIMIZER_AVERAGE_SPEED_KMH", .. })),
                "{} should be rejected",
                value
            );
        }
    }
}
