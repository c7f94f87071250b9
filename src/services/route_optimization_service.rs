//! Servicio de optimización de rutas
//!
//! Reúne los pedidos de una planta, arma el problema de ruteo con los
//! vehículos disponibles, lo resuelve fuera del runtime async y persiste
//! las rutas resultantes de forma atómica.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::dto::route_dto::{OptimizeRouteRequest, OptimizeRouteResponse, OrderRef, UnassignedOrder};
use crate::models::{
    Customer, Location, Order, OrderFilters, OrderStatus, Route, RouteStatus, RouteStop, StopStatus, Vehicle,
};
use crate::optimizer::{Job, OptimizerSettings, Problem, RouteSolver, Solution, TimeWindow, VehicleSpec};
use crate::repositories::DeliveryStore;
use crate::state::AppState;
use crate::utils::errors::{bad_request_error, not_found_error, AppError, AppResult};
use crate::utils::geo::round_to;

pub struct RouteOptimizationService {
    store: Arc<dyn DeliveryStore>,
    solver: Arc<dyn RouteSolver>,
    settings: OptimizerSettings,
    shift_start: NaiveTime,
}

impl RouteOptimizationService {
    pub fn new(
        store: Arc<dyn DeliveryStore>,
        solver: Arc<dyn RouteSolver>,
        settings: OptimizerSettings,
        shift_start: NaiveTime,
    ) -> Self {
        Self {
            store,
            solver,
            settings,
            shift_start,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.store.clone(),
            state.solver.clone(),
            state.config.optimizer.clone(),
            state.config.shift_start,
        )
    }

    /// Optimizar las rutas de una ubicación
    pub async fn optimize(&self, request: OptimizeRouteRequest) -> AppResult<OptimizeRouteResponse> {
        request.validate()?;

        let location = self
            .store
            .get_location(&request.location_id)
            .await?
            .ok_or_else(|| not_found_error("Location", &request.location_id))?;

        let orders = self.collect_orders(&location, request.orders.as_deref()).await?;
        if orders.is_empty() {
            log::info!("📭 Sin pedidos pendientes para {}", location.id);
            return Ok(OptimizeRouteResponse::empty(format!(
                "No pending orders to route for location '{}'",
                location.id
            )));
        }

        let mut vehicles = self.store.list_available_vehicles(&location.id).await?;
        if let Some(count) = request.vehicle_count {
            vehicles.truncate(count as usize);
        }
        if vehicles.is_empty() {
            log::warn!("🚫 Sin vehículos disponibles en {}", location.id);
            return Err(AppError::NoVehiclesAvailable(format!(
                "No available vehicles at location '{}'",
                location.id
            )));
        }

        let customers = self.load_customers(&orders).await?;
        let problem = self.build_problem(&location, &orders, &customers, &vehicles);

        log::info!(
            "🧮 Optimizando {} pedidos con {} vehículos en {} ({})",
            problem.jobs.len(),
            problem.vehicles.len(),
            location.id,
            self.solver.name()
        );

        let solver = self.solver.clone();
        let (problem, solution) = tokio::task::spawn_blocking(move || {
            let solution = solver.solve(&problem);
            (problem, solution)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Optimizer task failed: {}", e)))?;

        let unassigned = unassigned_orders(&problem, &solution);

        if solution.tours.is_empty() {
            log::warn!("❌ Ningún pedido pudo asignarse en {}", location.id);
            return Err(AppError::Infeasible {
                message: format!(
                    "None of the {} orders could be assigned to a vehicle",
                    problem.jobs.len()
                ),
                details: json!({ "unassigned": unassigned }),
            });
        }

        let date = request.date.unwrap_or_else(|| Utc::now().date_naive());
        let routes = self.build_routes(&location, &problem, &solution, date);

        self.store.save_plan(&routes).await?;

        let assigned = solution.assigned_jobs();
        let total_duration_hours = round_to(routes.iter().map(|r| r.estimated_duration_hours).sum(), 2);
        let message = if unassigned.is_empty() {
            format!("{} routes planned for {} orders", routes.len(), assigned)
        } else {
            format!(
                "{} routes planned for {} orders, {} orders could not be assigned",
                routes.len(),
                assigned,
                unassigned.len()
            )
        };

        log::info!("✅ {}", message);

        Ok(OptimizeRouteResponse {
            total_distance_km: round_to(solution.total_distance_km(), 2),
            total_duration_hours,
            orders_considered: orders.len(),
            routes,
            message,
            unassigned,
        })
    }

    /// Pedidos a planificar: la lista explícita o todos los pendientes
    async fn collect_orders(&self, location: &Location, explicit: Option<&[OrderRef]>) -> AppResult<Vec<Order>> {
        let refs = match explicit {
            None => {
                let filters = OrderFilters {
                    location_id: Some(location.id.clone()),
                    status: Some(OrderStatus::Pending),
                };
                return self.store.list_orders(&filters).await;
            }
            Some(refs) => refs,
        };

        let mut seen = HashSet::new();
        let refs: Vec<&OrderRef> = refs.iter().filter(|r| seen.insert(r.id.as_str())).collect();
        let ids: Vec<String> = refs.iter().map(|r| r.id.clone()).collect();

        let mut stored: HashMap<String, Order> = self
            .store
            .get_orders(&ids)
            .await?
            .into_iter()
            .map(|o| (o.id.clone(), o))
            .collect();

        let mut orders = Vec::with_capacity(refs.len());
        for order_ref in refs {
            let order = stored
                .remove(&order_ref.id)
                .ok_or_else(|| not_found_error("Order", &order_ref.id))?;

            if order.location_id != location.id {
                return Err(bad_request_error(&format!(
                    "Order '{}' belongs to location '{}', not '{}'",
                    order.id, order.location_id, location.id
                )));
            }
            if order.customer_id != order_ref.customer_id {
                return Err(bad_request_error(&format!(
                    "Order '{}' belongs to customer '{}', not '{}'",
                    order.id, order.customer_id, order_ref.customer_id
                )));
            }
            if order.quantity != order_ref.quantity {
                log::warn!(
                    "⚠️ Cantidad del pedido {} difiere ({} vs {}), se usa la almacenada",
                    order.id,
                    order_ref.quantity,
                    order.quantity
                );
            }
            if order.status != OrderStatus::Pending {
                log::info!("⏭️ Pedido {} omitido (estado {:?})", order.id, order.status);
                continue;
            }

            orders.push(order);
        }

        Ok(orders)
    }

    async fn load_customers(&self, orders: &[Order]) -> AppResult<HashMap<String, Customer>> {
        let mut ids: Vec<String> = orders.iter().map(|o| o.customer_id.clone()).collect();
        ids.sort();
        ids.dedup();

        let customers: HashMap<String, Customer> = self
            .store
            .get_customers(&ids)
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        if let Some(missing) = ids.iter().find(|id| !customers.contains_key(*id)) {
            return Err(not_found_error("Customer", missing));
        }

        Ok(customers)
    }

    fn build_problem(
        &self,
        location: &Location,
        orders: &[Order],
        customers: &HashMap<String, Customer>,
        vehicles: &[Vehicle],
    ) -> Problem {
        let jobs = orders
            .iter()
            .filter_map(|order| {
                let customer = customers.get(&order.customer_id)?;
                Some(Job {
                    order_id: order.id.clone(),
                    customer_id: customer.id.clone(),
                    point: customer.point(),
                    demand: order.quantity,
                    service_minutes: customer
                        .service_minutes
                        .map(|m| m.max(0) as f64)
                        .unwrap_or(self.settings.default_service_minutes as f64),
                    window: time_window(customer, self.shift_start),
                })
            })
            .collect();

        let vehicles = vehicles
            .iter()
            .map(|v| VehicleSpec {
                vehicle_id: v.id.clone(),
                driver_id: v.driver_id.clone(),
                capacity: v.capacity,
            })
            .collect();

        Problem {
            depot: location.point(),
            jobs,
            vehicles,
            settings: self.settings.clone(),
        }
    }

    fn build_routes(&self, location: &Location, problem: &Problem, solution: &Solution, date: NaiveDate) -> Vec<Route> {
        let shift_start: DateTime<Utc> = Utc.from_utc_datetime(&date.and_time(self.shift_start));
        let created_at = Utc::now();

        solution
            .tours
            .iter()
            .enumerate()
            .map(|(index, tour)| {
                let vehicle = &problem.vehicles[tour.vehicle];
                let route_id = Uuid::new_v4().to_string();

                let stops = tour
                    .stops
                    .iter()
                    .enumerate()
                    .map(|(position, stop)| {
                        let job = &problem.jobs[stop.job];
                        RouteStop {
                            id: Uuid::new_v4().to_string(),
                            route_id: route_id.clone(),
                            customer_id: job.customer_id.clone(),
                            order_id: job.order_id.clone(),
                            stop_number: position as i32 + 1,
                            estimated_arrival: shift_start
                                + Duration::seconds((stop.arrival_minutes * 60.0).round() as i64),
                            distance_from_previous_km: round_to(stop.distance_from_previous_km, 2),
                            status: StopStatus::Pending,
                            completed_at: None,
                            coordinates: Some(job.point),
                        }
                    })
                    .collect();

                Route {
                    id: route_id,
                    name: format!("{} - Ruta {} ({})", location.name, index + 1, date),
                    driver_id: vehicle.driver_id.clone(),
                    vehicle_id: vehicle.vehicle_id.clone(),
                    location_id: location.id.clone(),
                    date,
                    estimated_duration_hours: round_to(tour.duration_minutes / 60.0, 2),
                    distance_km: round_to(tour.distance_km, 2),
                    status: RouteStatus::Planned,
                    stops,
                    created_at,
                }
            })
            .collect()
    }
}

/// Ventana horaria del cliente en minutos desde el inicio del turno.
///
/// Una ventana invertida (inicio posterior al fin) se ignora. Una ventana
/// bien formada que cierra antes del turno queda con `end < 0` y el
/// optimizador la reporta como inalcanzable.
fn time_window(customer: &Customer, shift_start: NaiveTime) -> Option<TimeWindow> {
    let minutes = |t: NaiveTime| t.signed_duration_since(shift_start).num_minutes() as f64;

    match (customer.window_start, customer.window_end) {
        (None, None) => None,
        (Some(start), Some(end)) if start > end => {
            log::warn!(
                "⚠️ Ventana horaria invertida para el cliente {} ({} - {}), se ignora",
                customer.id,
                start,
                end
            );
            None
        }
        (Some(start), None) => Some(TimeWindow {
            start: minutes(start).max(0.0),
            end: f64::INFINITY,
        }),
        (None, Some(end)) => Some(TimeWindow {
            start: 0.0,
            end: minutes(end),
        }),
        (Some(start), Some(end)) => Some(TimeWindow {
            start: minutes(start).max(0.0),
            end: minutes(end),
        }),
    }
}

fn unassigned_orders(problem: &Problem, solution: &Solution) -> Vec<UnassignedOrder> {
    solution
        .unassigned
        .iter()
        .map(|u| {
            let job = &problem.jobs[u.job];
            UnassignedOrder {
                order_id: job.order_id.clone(),
                customer_id: job.customer_id.clone(),
                reason: u.reason,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VehicleStatus;
    use crate::optimizer::{InsertionSolver, UnassignedReason};
    use crate::repositories::MemoryDeliveryStore;

    async fn seeded_store() -> Arc<MemoryDeliveryStore> {
        let store = Arc::new(MemoryDeliveryStore::new());
        store
            .insert_location(Location {
                id: "loc_1".to_string(),
                name: "Planta Central".to_string(),
                latitude: 33.4484,
                longitude: -112.0740,
            })
            .await;
        store
            .insert_location(Location {
                id: "loc_9".to_string(),
                name: "Planta Lejana".to_string(),
                latitude: 34.0,
                longitude: -111.0,
            })
            .await;

        for (i, lat) in [33.46, 33.47, 33.49].into_iter().enumerate() {
            let n = i + 1;
            store
                .insert_customer(Customer {
                    id: format!("cust_{}", n),
                    name: format!("Cliente {}", n),
                    location_id: "loc_1".to_string(),
                    address: None,
                    latitude: lat,
                    longitude: -112.07,
                    window_start: None,
                    window_end: None,
                    service_minutes: Some(5),
                })
                .await;
            store
                .insert_order(Order {
                    id: format!("ord_{}", n),
                    customer_id: format!("cust_{}", n),
                    location_id: "loc_1".to_string(),
                    quantity: 10,
                    status: OrderStatus::Pending,
                    created_at: Utc::now(),
                })
                .await;
        }

        for (id, capacity) in [("veh_1", 100), ("veh_2", 50)] {
            store
                .insert_vehicle(Vehicle {
                    id: id.to_string(),
                    location_id: "loc_1".to_string(),
                    name: id.to_string(),
                    capacity,
                    driver_id: Some(format!("drv_{}", id)),
                    status: VehicleStatus::Available,
                })
                .await;
        }

        store
    }

    fn service(store: Arc<MemoryDeliveryStore>) -> RouteOptimizationService {
        RouteOptimizationService::new(
            store,
            Arc::new(InsertionSolver),
            OptimizerSettings::default(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        )
    }

    fn order_ref(id: &str, customer: &str) -> OrderRef {
        OrderRef {
            id: id.to_string(),
            customer_id: customer.to_string(),
            quantity: 10,
        }
    }

    #[tokio::test]
    async fn test_plans_all_pending_orders() {
        let store = seeded_store().await;
        let response = service(store.clone())
            .optimize(OptimizeRouteRequest::for_location("loc_1"))
            .await
            .unwrap();

        assert_eq!(response.orders_considered, 3);
        assert_eq!(response.total_stops(), 3);
        assert!(response.unassigned.is_empty());
        for route in &response.routes {
            let numbers: Vec<i32> = route.stops.iter().map(|s| s.stop_number).collect();
            assert_eq!(numbers, (1..=route.stops.len() as i32).collect::<Vec<_>>());
            assert_eq!(route.status, RouteStatus::Planned);
            assert!(route.driver_id.is_some());
        }

        let pending = store
            .list_orders(&OrderFilters {
                location_id: Some("loc_1".to_string()),
                status: Some(OrderStatus::Pending),
            })
            .await
            .unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_estimated_arrival_starts_from_shift() {
        let store = seeded_store().await;
        let mut request = OptimizeRouteRequest::for_location("loc_1");
        request.date = NaiveDate::from_ymd_opt(2026, 7, 4);

        let response = service(store).optimize(request).await.unwrap();
        let shift = Utc.from_utc_datetime(&NaiveDate::from_ymd_opt(2026, 7, 4).unwrap().and_hms_opt(8, 0, 0).unwrap());

        for stop in response.routes.iter().flat_map(|r| r.stops.iter()) {
            assert!(stop.estimated_arrival > shift);
        }
        assert!(response.routes[0].name.contains("2026-07-04"));
    }

    #[tokio::test]
    async fn test_unknown_location_is_not_found() {
        let store = seeded_store().await;
        let result = service(store).optimize(OptimizeRouteRequest::for_location("loc_404")).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_explicit_orders_are_checked() {
        let store = seeded_store().await;
        let svc = service(store);

        let mut request = OptimizeRouteRequest::for_location("loc_1");
        request.orders = Some(vec![order_ref("ord_missing", "cust_1")]);
        assert!(matches!(svc.optimize(request).await, Err(AppError::NotFound(_))));

        let mut request = OptimizeRouteRequest::for_location("loc_1");
        request.orders = Some(vec![order_ref("ord_1", "cust_2")]);
        assert!(matches!(svc.optimize(request).await, Err(AppError::BadRequest(_))));

        let mut request = OptimizeRouteRequest::for_location("loc_9");
        request.orders = Some(vec![order_ref("ord_1", "cust_1")]);
        assert!(matches!(svc.optimize(request).await, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_explicit_orders_dedup_and_skip_routed() {
        let store = seeded_store().await;
        let svc = service(store);

        let mut request = OptimizeRouteRequest::for_location("loc_1");
        request.orders = Some(vec![order_ref("ord_1", "cust_1"), order_ref("ord_1", "cust_1")]);
        let first = svc.optimize(request.clone()).await.unwrap();
        assert_eq!(first.orders_considered, 1);
        assert_eq!(first.total_stops(), 1);

        // Ya está ruteado: no hay nada que planificar
        let second = svc.optimize(request).await.unwrap();
        assert!(second.routes.is_empty());
        assert!(!second.message.is_empty());
    }

    #[tokio::test]
    async fn test_no_vehicles_available() {
        let store = seeded_store().await;
        store
            .insert_customer(Customer {
                id: "cust_far".to_string(),
                name: "Cliente".to_string(),
                location_id: "loc_9".to_string(),
                address: None,
                latitude: 34.01,
                longitude: -111.0,
                window_start: None,
                window_end: None,
                service_minutes: None,
            })
            .await;
        store
            .insert_order(Order {
                id: "ord_far".to_string(),
                customer_id: "cust_far".to_string(),
                location_id: "loc_9".to_string(),
                quantity: 5,
                status: OrderStatus::Pending,
                created_at: Utc::now(),
            })
            .await;

        let result = service(store).optimize(OptimizeRouteRequest::for_location("loc_9")).await;
        assert!(matches!(result, Err(AppError::NoVehiclesAvailable(_))));
    }

    #[tokio::test]
    async fn test_infeasible_when_nothing_fits() {
        let store = seeded_store().await;
        let mut request = OptimizeRouteRequest::for_location("loc_1");
        request.vehicle_count = Some(1);
        request.orders = Some(vec![order_ref("ord_1", "cust_1")]);

        // Un pedido más grande que cualquier vehículo
        store
            .insert_order(Order {
                id: "ord_1".to_string(),
                customer_id: "cust_1".to_string(),
                location_id: "loc_1".to_string(),
                quantity: 1000,
                status: OrderStatus::Pending,
                created_at: Utc::now(),
            })
            .await;

        match service(store).optimize(request).await {
            Err(AppError::Infeasible { details, .. }) => {
                assert_eq!(details["unassigned"][0]["reason"], "capacity");
            }
            other => panic!("expected infeasible, got {:?}", other.map(|r| r.message)),
        }
    }

    #[test]
    fn test_time_window_relative_to_shift() {
        let shift = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        let mut customer = Customer {
            id: "c".to_string(),
            name: "c".to_string(),
            location_id: "loc_1".to_string(),
            address: None,
            latitude: 0.0,
            longitude: 0.0,
            window_start: NaiveTime::from_hms_opt(9, 30, 0),
            window_end: NaiveTime::from_hms_opt(11, 0, 0),
            service_minutes: None,
        };
        assert_eq!(time_window(&customer, shift), Some(TimeWindow { start: 90.0, end: 180.0 }));

        customer.window_start = NaiveTime::from_hms_opt(6, 0, 0);
        customer.window_end = NaiveTime::from_hms_opt(7, 0, 0);
        let closed = time_window(&customer, shift).unwrap();
        assert!(closed.end < 0.0);

        customer.window_start = None;
        customer.window_end = None;
        assert_eq!(time_window(&customer, shift), None);
    }

    #[test]
    fn test_inverted_window_is_ignored() {
        let shift = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        let mut customer = Customer {
            id: "c".to_string(),
            name: "c".to_string(),
            location_id: "loc_1".to_string(),
            address: None,
            latitude: 0.0,
            longitude: 0.0,
            window_start: NaiveTime::from_hms_opt(7, 0, 0),
            window_end: NaiveTime::from_hms_opt(6, 0, 0),
            service_minutes: None,
        };
        // Antes del turno e invertida: no debe tratarse como ventana cerrada
        assert_eq!(time_window(&customer, shift), None);

        customer.window_start = NaiveTime::from_hms_opt(12, 0, 0);
        customer.window_end = NaiveTime::from_hms_opt(10, 0, 0);
        assert_eq!(time_window(&customer, shift), None);
    }

    #[test]
    fn test_unassigned_reason_is_reported() {
        let reason = UnassignedReason::TimeWindow;
        assert_eq!(serde_json::to_value(reason).unwrap(), "time_window");
    }
}
