//! Repositorios
//!
//! Acceso a datos detrás del trait `DeliveryStore`: PostgreSQL en
//! producción y un almacén en memoria para desarrollo y pruebas.

pub mod memory_repository;
pub mod postgres_repository;

pub use memory_repository::MemoryDeliveryStore;
pub use postgres_repository::PgDeliveryStore;

use chrono::{DateTime, Utc};

use crate::models::{
    Customer, DriverLocation, Location, Order, OrderFilters, Route, RouteFilters, RouteStatus, User,
    Vehicle,
};
use crate::utils::errors::AppResult;

/// Almacén de datos del reparto
#[async_trait::async_trait]
pub trait DeliveryStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn ping(&self) -> AppResult<()>;

    async fn get_location(&self, id: &str) -> AppResult<Option<Location>>;

    async fn get_customer(&self, id: &str) -> AppResult<Option<Customer>>;

    async fn get_customers(&self, ids: &[String]) -> AppResult<Vec<Customer>>;

    async fn get_orders(&self, ids: &[String]) -> AppResult<Vec<Order>>;

    /// Pedidos que cumplen los filtros, ordenados por fecha de creación e id
    async fn list_orders(&self, filters: &OrderFilters) -> AppResult<Vec<Order>>;

    async fn create_order(&self, order: Order) -> AppResult<Order>;

    /// Vehículos `available` de la ubicación, por capacidad descendente e id
    async fn list_available_vehicles(&self, location_id: &str) -> AppResult<Vec<Vehicle>>;

    /// Guarda las rutas y marca sus pedidos como `routed` en una sola
    /// operación. Falla con `Conflict` si algún pedido ya no está `pending`.
    async fn save_plan(&self, routes: &[Route]) -> AppResult<()>;

    async fn get_route(&self, id: &str) -> AppResult<Option<Route>>;

    async fn list_routes(&self, filters: &RouteFilters) -> AppResult<Vec<Route>>;

    /// Cambia el estado solo si sigue siendo `from`; al cancelar devuelve los
    /// pedidos no entregados a `pending`.
    async fn update_route_status(&self, id: &str, from: RouteStatus, to: RouteStatus) -> AppResult<Route>;

    /// Completa una parada pendiente de una ruta activa y marca el pedido
    /// como entregado.
    async fn complete_stop(&self, route_id: &str, stop_id: &str, at: DateTime<Utc>) -> AppResult<Route>;

    async fn record_driver_location(&self, location: &DriverLocation) -> AppResult<()>;

    async fn latest_driver_location(&self, driver_id: &str) -> AppResult<Option<DriverLocation>>;

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
}
