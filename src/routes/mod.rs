//! Routers de la API

pub mod auth_routes;
pub mod driver_routes;
pub mod order_routes;
pub mod route_routes;
