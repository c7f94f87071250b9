//! Almacén en memoria
//!
//! Todas las tablas viven detrás de un único `RwLock`, de modo que
//! `save_plan` y los cambios de estado son atómicos. Pensado para
//! desarrollo y pruebas: el historial de posiciones se recorta por chofer.

use chrono::{DateTime, NaiveTime, Utc};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

use super::DeliveryStore;
use crate::models::{
    Customer, DriverLocation, Location, Order, OrderFilters, OrderStatus, Route, RouteFilters, RouteStatus,
    StopStatus, User, UserRole, Vehicle, VehicleStatus,
};
use crate::utils::errors::{not_found_error, AppError, AppResult};

/// Posiciones que se conservan por chofer; las más antiguas se descartan
pub const MAX_LOCATION_HISTORY_PER_DRIVER: usize = 500;

#[derive(Default)]
struct Tables {
    locations: HashMap<String, Location>,
    customers: HashMap<String, Customer>,
    orders: HashMap<String, Order>,
    vehicles: HashMap<String, Vehicle>,
    routes: HashMap<String, Route>,
    users: HashMap<String, User>,
    driver_locations: HashMap<String, VecDeque<DriverLocation>>,
}

#[derive(Default)]
pub struct MemoryDeliveryStore {
    tables: RwLock<Tables>,
}

impl MemoryDeliveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_location(&self, location: Location) {
        self.tables.write().await.locations.insert(location.id.clone(), location);
    }

    pub async fn insert_customer(&self, customer: Customer) {
        self.tables.write().await.customers.insert(customer.id.clone(), customer);
    }

    pub async fn insert_order(&self, order: Order) {
        self.tables.write().await.orders.insert(order.id.clone(), order);
    }

    pub async fn insert_vehicle(&self, vehicle: Vehicle) {
        self.tables.write().await.vehicles.insert(vehicle.id.clone(), vehicle);
    }

    pub async fn insert_user(&self, user: User) {
        self.tables.write().await.users.insert(user.id.clone(), user);
    }

    /// Datos de demostración para levantar el servicio sin base de datos.
    /// Los usuarios solo se crean si se entrega un hash de contraseña.
    pub async fn seed_demo_data(&self, password_hash: Option<&str>) {
        let now = Utc::now();
        let plants = [
            ("loc_1", "Planta Central", 33.4484, -112.0740),
            ("loc_2", "Planta Mesa", 33.4152, -111.8315),
        ];
        for (id, name, latitude, longitude) in plants {
            self.insert_location(Location {
                id: id.to_string(),
                name: name.to_string(),
                latitude,
                longitude,
            })
            .await;
        }

        let customers = [
            ("cust_1", "loc_1", "Mercado Roosevelt", 33.4589, -112.0712, None),
            ("cust_2", "loc_1", "Bar La Palma", 33.4950, -112.0400, Some((9, 12))),
            ("cust_3", "loc_1", "Gasolinera Norte", 33.5210, -112.1001, None),
            ("cust_4", "loc_2", "Súper Dobson", 33.3920, -111.8740, Some((8, 11))),
            ("cust_5", "loc_2", "Heladería Main St", 33.4150, -111.8300, None),
            ("cust_6", "loc_2", "Estadio Tempe", 33.4255, -111.9400, None),
        ];
        for (i, (id, location_id, name, latitude, longitude, window)) in customers.into_iter().enumerate() {
            let (window_start, window_end) = match window {
                Some((from, to)) => (NaiveTime::from_hms_opt(from, 0, 0), NaiveTime::from_hms_opt(to, 0, 0)),
                None => (None, None),
            };
            self.insert_customer(Customer {
                id: id.to_string(),
                name: name.to_string(),
                location_id: location_id.to_string(),
                address: None,
                latitude,
                longitude,
                window_start,
                window_end,
                service_minutes: None,
            })
            .await;
            self.insert_order(Order {
                id: format!("ord_{}", i + 1),
                customer_id: id.to_string(),
                location_id: location_id.to_string(),
                quantity: 20 + 10 * i as i32,
                status: OrderStatus::Pending,
                created_at: now,
            })
            .await;
        }

        let vehicles = [
            ("veh_1", "loc_1", "Camión 1", 200, Some("drv_1")),
            ("veh_2", "loc_1", "Camión 2", 120, None),
            ("veh_3", "loc_2", "Camión 3", 150, Some("drv_2")),
            ("veh_4", "loc_2", "Camión 4", 100, None),
        ];
        for (id, location_id, name, capacity, driver_id) in vehicles {
            self.insert_vehicle(Vehicle {
                id: id.to_string(),
                location_id: location_id.to_string(),
                name: name.to_string(),
                capacity,
                driver_id: driver_id.map(str::to_string),
                status: VehicleStatus::Available,
            })
            .await;
        }

        if let Some(hash) = password_hash {
            let users = [
                ("usr_1", "gerente", UserRole::Manager, None),
                ("usr_2", "chofer1", UserRole::Driver, Some("drv_1")),
                ("usr_3", "chofer2", UserRole::Driver, Some("drv_2")),
            ];
            for (id, username, role, driver_id) in users {
                self.insert_user(User {
                    id: id.to_string(),
                    username: username.to_string(),
                    password_hash: hash.to_string(),
                    role,
                    driver_id: driver_id.map(str::to_string),
                })
                .await;
            }
        }
    }
}

#[async_trait::async_trait]
impl DeliveryStore for MemoryDeliveryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn get_location(&self, id: &str) -> AppResult<Option<Location>> {
        Ok(self.tables.read().await.locations.get(id).cloned())
    }

    async fn get_customer(&self, id: &str) -> AppResult<Option<Customer>> {
        Ok(self.tables.read().await.customers.get(id).cloned())
    }

    async fn get_customers(&self, ids: &[String]) -> AppResult<Vec<Customer>> {
        let tables = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.customers.get(id).cloned()).collect())
    }

    async fn get_orders(&self, ids: &[String]) -> AppResult<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.orders.get(id).cloned()).collect())
    }

    async fn list_orders(&self, filters: &OrderFilters) -> AppResult<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables.orders.values().filter(|o| filters.matches(o)).cloned().collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(orders)
    }

    async fn create_order(&self, order: Order) -> AppResult<Order> {
        let mut tables = self.tables.write().await;
        if tables.orders.contains_key(&order.id) {
            return Err(AppError::Conflict(format!("Order '{}' already exists", order.id)));
        }
        tables.orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn list_available_vehicles(&self, location_id: &str) -> AppResult<Vec<Vehicle>> {
        let tables = self.tables.read().await;
        let mut vehicles: Vec<Vehicle> = tables
            .vehicles
            .values()
            .filter(|v| v.location_id == location_id && v.status == VehicleStatus::Available)
            .cloned()
            .collect();
        vehicles.sort_by(|a, b| b.capacity.cmp(&a.capacity).then_with(|| a.id.cmp(&b.id)));
        Ok(vehicles)
    }

    async fn save_plan(&self, routes: &[Route]) -> AppResult<()> {
        let mut tables = self.tables.write().await;

        // Verificar todo antes de escribir nada
        for stop in routes.iter().flat_map(|r| r.stops.iter()) {
            match tables.orders.get(&stop.order_id) {
                Some(order) if order.status == OrderStatus::Pending => {}
                Some(_) => {
                    return Err(AppError::Conflict(format!(
                        "Order '{}' is no longer pending",
                        stop.order_id
                    )))
                }
                None => return Err(not_found_error("Order", &stop.order_id)),
            }
        }

        for route in routes {
            for stop in &route.stops {
                if let Some(order) = tables.orders.get_mut(&stop.order_id) {
                    order.status = OrderStatus::Routed;
                }
            }
            tables.routes.insert(route.id.clone(), route.clone());
        }
        Ok(())
    }

    async fn get_route(&self, id: &str) -> AppResult<Option<Route>> {
        Ok(self.tables.read().await.routes.get(id).cloned())
    }

    async fn list_routes(&self, filters: &RouteFilters) -> AppResult<Vec<Route>> {
        let tables = self.tables.read().await;
        let mut routes: Vec<Route> = tables.routes.values().filter(|r| filters.matches(r)).cloned().collect();
        routes.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(routes)
    }

    async fn update_route_status(&self, id: &str, from: RouteStatus, to: RouteStatus) -> AppResult<Route> {
        let mut tables = self.tables.write().await;
        let tables = &mut *tables;

        let route = tables.routes.get_mut(id).ok_or_else(|| not_found_error("Route", id))?;
        if route.status != from {
            return Err(AppError::Conflict(format!(
                "Route '{}' changed to '{}' concurrently",
                id,
                route.status.as_str()
            )));
        }
        route.status = to;

        if to == RouteStatus::Cancelled {
            for stop in route.stops.iter().filter(|s| s.status == StopStatus::Pending) {
                if let Some(order) = tables.orders.get_mut(&stop.order_id) {
                    if order.status == OrderStatus::Routed {
                        order.status = OrderStatus::Pending;
                    }
                }
            }
        }

        Ok(route.clone())
    }

    async fn complete_stop(&self, route_id: &str, stop_id: &str, at: DateTime<Utc>) -> AppResult<Route> {
        let mut tables = self.tables.write().await;
        let tables = &mut *tables;

        let route = tables
            .routes
            .get_mut(route_id)
            .ok_or_else(|| not_found_error("Route", route_id))?;
        if route.status != RouteStatus::Active {
            return Err(AppError::Conflict(format!(
                "Route '{}' is '{}', stops can only be completed on active routes",
                route_id,
                route.status.as_str()
            )));
        }

        let stop = route
            .stops
            .iter_mut()
            .find(|s| s.id == stop_id)
            .ok_or_else(|| not_found_error("Stop", stop_id))?;
        if stop.status == StopStatus::Completed {
            return Err(AppError::Conflict(format!("Stop '{}' is already completed", stop_id)));
        }
        stop.status = StopStatus::Completed;
        stop.completed_at = Some(at);

        if let Some(order) = tables.orders.get_mut(&stop.order_id) {
            order.status = OrderStatus::Delivered;
        }

        Ok(route.clone())
    }

    async fn record_driver_location(&self, location: &DriverLocation) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let history = tables.driver_locations.entry(location.driver_id.clone()).or_default();
        history.push_back(location.clone());
        while history.len() > MAX_LOCATION_HISTORY_PER_DRIVER {
            history.pop_front();
        }
        Ok(())
    }

    async fn latest_driver_location(&self, driver_id: &str) -> AppResult<Option<DriverLocation>> {
        let tables = self.tables.read().await;
        Ok(tables
            .driver_locations
            .get(driver_id)
            .and_then(|history| history.iter().max_by_key(|l| l.timestamp))
            .cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }
}
