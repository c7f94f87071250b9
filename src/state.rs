//! Estado compartido de la aplicación
//!
//! Este módulo define el estado que se pasa a través del router de Axum.
//! Todas las dependencias se inyectan al construirlo.

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheOperations;
use crate::config::environment::EnvironmentConfig;
use crate::metrics::Metrics;
use crate::middleware::rate_limit::RateLimitState;
use crate::optimizer::{InsertionSolver, RouteSolver};
use crate::repositories::DeliveryStore;
use crate::utils::jwt::JwtConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EnvironmentConfig>,
    pub store: Arc<dyn DeliveryStore>,
    pub cache: Arc<dyn CacheOperations>,
    pub solver: Arc<dyn RouteSolver>,
    pub http_client: Client,
    pub rate_limit: RateLimitState,
    pub metrics: Metrics,
    pub jwt: JwtConfig,
}

impl AppState {
    pub fn new(
        config: EnvironmentConfig,
        store: Arc<dyn DeliveryStore>,
        cache: Arc<dyn CacheOperations>,
    ) -> Result<Self, prometheus::Error> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());

        Ok(Self {
            rate_limit: RateLimitState::from_config(&config),
            jwt: JwtConfig::from(&config),
            metrics: Metrics::new()?,
            solver: Arc::new(InsertionSolver),
            config: Arc::new(config),
            store,
            cache,
            http_client,
        })
    }

    /// Reemplazar la estrategia de resolución
    pub fn with_solver(mut self, solver: Arc<dyn RouteSolver>) -> Self {
        self.solver = solver;
        self
    }
}
