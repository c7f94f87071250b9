//! Modelos de datos
//!
//! Este módulo contiene todos los modelos de datos del dominio de reparto.

pub mod customer;
pub mod driver;
pub mod location;
pub mod order;
pub mod route;
pub mod user;
pub mod vehicle;

pub use customer::Customer;
pub use driver::DriverLocation;
pub use location::Location;
pub use order::{Order, OrderFilters, OrderStatus};
pub use route::{Route, RouteFilters, RouteProgress, RouteStatus, RouteStop, StopStatus};
pub use user::{User, UserRole};
pub use vehicle::{Vehicle, VehicleStatus};
