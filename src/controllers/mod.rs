//! Controladores HTTP
//!
//! Los handlers extraen y validan la entrada, verifican el rol del usuario
//! y delegan en los servicios.

pub mod auth_controller;
pub mod driver_controller;
pub mod health_controller;
pub mod order_controller;
pub mod route_controller;
