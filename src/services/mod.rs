//! Services module
//!
//! Este módulo contiene la lógica de negocio de la aplicación. Los
//! controladores construyen los servicios a partir del `AppState`.

pub mod auth_service;
pub mod directions_service;
pub mod driver_location_service;
pub mod order_service;
pub mod route_optimization_service;
pub mod route_tracking_service;

pub use auth_service::AuthService;
pub use directions_service::DirectionsService;
pub use driver_location_service::DriverLocationService;
pub use order_service::OrderService;
pub use route_optimization_service::RouteOptimizationService;
pub use route_tracking_service::RouteTrackingService;
