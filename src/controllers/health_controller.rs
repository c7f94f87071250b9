//! Health check y métricas

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::state::AppState;
use crate::utils::errors::AppError;

/// Estado del servicio y de sus dependencias
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let store_ok = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            log::error!("❌ Health check: almacén no responde: {}", e);
            false
        }
    };
    let cache_ok = state.cache.ping().await;

    let status = if store_ok && cache_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if status == StatusCode::OK { "ok" } else { "degraded" },
            "service": "ice-delivery-routing",
            "version": env!("CARGO_PKG_VERSION"),
            "environment": state.config.environment,
            "store": { "backend": state.store.backend_name(), "ok": store_ok },
            "cache": { "backend": state.cache.backend_name(), "ok": cache_ok },
            "solver": state.solver.name(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

/// Exportar métricas en formato Prometheus
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state.metrics.render()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}
