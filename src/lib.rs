//! Backend de optimización de rutas para el reparto de hielo
//!
//! Expone la API HTTP (axum), el optimizador de rutas y un cliente tipado
//! para el contrato de optimización.

pub mod cache;
pub mod client;
pub mod config;
pub mod controllers;
pub mod dto;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod optimizer;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

use axum::{middleware as axum_middleware, routing::get, Router};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use controllers::health_controller;
use middleware::{auth::auth_middleware, cors::cors_layer};
use state::AppState;

/// Construir el router completo de la aplicación
pub fn build_app(state: AppState) -> Router {
    let protected = Router::new()
        .nest("/routes", routes::route_routes::create_route_routes(state.clone()))
        .nest("/drivers", routes::driver_routes::create_driver_routes())
        .nest("/orders", routes::order_routes::create_order_routes())
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    let api = protected.nest("/auth", routes::auth_routes::create_auth_routes());

    Router::new()
        .route("/health", get(health_controller::health_check))
        .route("/metrics", get(health_controller::metrics))
        .nest("/api", api)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
