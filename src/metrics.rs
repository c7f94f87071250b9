//! Métricas Prometheus
//!
//! Cada instancia tiene su propio `Registry`, así varias aplicaciones en el
//! mismo proceso (por ejemplo en las pruebas) no chocan al registrar.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::utils::errors::AppError;

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub route_optimizations: IntCounterVec,
    pub routes_created: IntCounter,
    pub driver_location_updates: IntCounter,
    pub optimization_duration: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let route_optimizations = IntCounterVec::new(
            Opts::new("route_optimizations_total", "Optimizaciones de rutas por resultado"),
            &["outcome"],
        )?;
        let routes_created = IntCounter::new("routes_created_total", "Rutas creadas por el optimizador")?;
        let driver_location_updates =
            IntCounter::new("driver_location_updates_total", "Posiciones de choferes recibidas")?;
        let optimization_duration = Histogram::with_opts(
            HistogramOpts::new(
                "route_optimization_duration_seconds",
                "Duración de la resolución del problema de ruteo",
            )
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0]),
        )?;

        registry.register(Box::new(route_optimizations.clone()))?;
        registry.register(Box::new(routes_created.clone()))?;
        registry.register(Box::new(driver_location_updates.clone()))?;
        registry.register(Box::new(optimization_duration.clone()))?;

        Ok(Self {
            registry,
            route_optimizations,
            routes_created,
            driver_location_updates,
            optimization_duration,
        })
    }

    pub fn record_optimization(&self, outcome: &str) {
        self.route_optimizations.with_label_values(&[outcome]).inc();
    }

    /// Exportar en formato de texto de Prometheus
    pub fn render(&self) -> Result<String, AppError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| AppError::Internal(format!("Error codificando métricas: {}", e)))?;

        String::from_utf8(buffer).map_err(|e| AppError::Internal(format!("Métricas no son UTF-8: {}", e)))
    }
}
