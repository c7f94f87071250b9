use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use std::collections::HashMap;

use super::DeliveryStore;
use crate::models::{
    Customer, DriverLocation, Location, Order, OrderFilters, Route, RouteFilters, RouteStatus, RouteStop,
    StopStatus, User, Vehicle,
};
use crate::utils::errors::{not_found_error, AppError, AppResult};
use crate::utils::geo::GeoPoint;

// Filas planas de las tablas de rutas
#[derive(Debug, sqlx::FromRow)]
struct RouteRow {
    id: String,
    name: String,
    driver_id: Option<String>,
    vehicle_id: String,
    location_id: String,
    date: NaiveDate,
    estimated_duration_hours: f64,
    distance_km: f64,
    status: RouteStatus,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct StopRow {
    id: String,
    route_id: String,
    customer_id: String,
    order_id: String,
    stop_number: i32,
    estimated_arrival: DateTime<Utc>,
    distance_from_previous_km: f64,
    status: StopStatus,
    completed_at: Option<DateTime<Utc>>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl From<StopRow> for RouteStop {
    fn from(row: StopRow) -> Self {
        let coordinates = match (row.latitude, row.longitude) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        };

        Self {
            id: row.id,
            route_id: row.route_id,
            customer_id: row.customer_id,
            order_id: row.order_id,
            stop_number: row.stop_number,
            estimated_arrival: row.estimated_arrival,
            distance_from_previous_km: row.distance_from_previous_km,
            status: row.status,
            completed_at: row.completed_at,
            coordinates,
        }
    }
}

const ROUTE_COLUMNS: &str = "id, name, driver_id, vehicle_id, location_id, date, estimated_duration_hours, \
                             distance_km, status, created_at";

const STOP_COLUMNS: &str = "id, route_id, customer_id, order_id, stop_number, estimated_arrival, \
                            distance_from_previous_km, status, completed_at, latitude, longitude";

pub struct PgDeliveryStore {
    pool: PgPool,
}

impl PgDeliveryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Cargar las paradas de un conjunto de rutas y armar los agregados
    async fn attach_stops(&self, rows: Vec<RouteRow>) -> AppResult<Vec<Route>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let stop_rows = sqlx::query_as::<_, StopRow>(&format!(
            "SELECT {} FROM route_stops WHERE route_id = ANY($1) ORDER BY route_id, stop_number",
            STOP_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut stops_by_route: HashMap<String, Vec<RouteStop>> = HashMap::new();
        for row in stop_rows {
            stops_by_route.entry(row.route_id.clone()).or_default().push(row.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| Route {
                stops: stops_by_route.remove(&row.id).unwrap_or_default(),
                id: row.id,
                name: row.name,
                driver_id: row.driver_id,
                vehicle_id: row.vehicle_id,
                location_id: row.location_id,
                date: row.date,
                estimated_duration_hours: row.estimated_duration_hours,
                distance_km: row.distance_km,
                status: row.status,
                created_at: row.created_at,
            })
            .collect())
    }

    async fn require_route(&self, id: &str) -> AppResult<Route> {
        self.get_route(id).await?.ok_or_else(|| not_found_error("Route", id))
    }
}

#[async_trait::async_trait]
impl DeliveryStore for PgDeliveryStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_location(&self, id: &str) -> AppResult<Option<Location>> {
        let location =
            sqlx::query_as::<_, Location>("SELECT id, name, latitude, longitude FROM locations WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(location)
    }

    async fn get_customer(&self, id: &str) -> AppResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, location_id, address, latitude, longitude,
                   window_start, window_end, service_minutes
            FROM customers
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    async fn get_customers(&self, ids: &[String]) -> AppResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, location_id, address, latitude, longitude,
                   window_start, window_end, service_minutes
            FROM customers
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    async fn get_orders(&self, ids: &[String]) -> AppResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, customer_id, location_id, quantity, status, created_at
            FROM orders
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    async fn list_orders(&self, filters: &OrderFilters) -> AppResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, customer_id, location_id, quantity, status, created_at
            FROM orders
            WHERE ($1::TEXT IS NULL OR location_id = $1)
              AND ($2::order_status IS NULL OR status = $2)
            ORDER BY created_at, id
            "#,
        )
        .bind(filters.location_id.as_deref())
        .bind(filters.status)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    async fn create_order(&self, order: Order) -> AppResult<Order> {
        let created = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (id, customer_id, location_id, quantity, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, customer_id, location_id, quantity, status, created_at
            "#,
        )
        .bind(&order.id)
        .bind(&order.customer_id)
        .bind(&order.location_id)
        .bind(order.quantity)
        .bind(order.status)
        .bind(order.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            log::error!("❌ Error creando pedido {}: {}", order.id, e);
            AppError::Database(e)
        })?;

        Ok(created)
    }

    async fn list_available_vehicles(&self, location_id: &str) -> AppResult<Vec<Vehicle>> {
        let vehicles = sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT id, location_id, name, capacity, driver_id, status
            FROM vehicles
            WHERE location_id = $1 AND status = 'available'
            ORDER BY capacity DESC, id
            "#,
        )
        .bind(location_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(vehicles)
    }

    async fn save_plan(&self, routes: &[Route]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        for route in routes {
            sqlx::query(
                r#"
                INSERT INTO routes (id, name, driver_id, vehicle_id, location_id, date,
                                    estimated_duration_hours, distance_km, status, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(&route.id)
            .bind(&route.name)
            .bind(&route.driver_id)
            .bind(&route.vehicle_id)
            .bind(&route.location_id)
            .bind(route.date)
            .bind(route.estimated_duration_hours)
            .bind(route.distance_km)
            .bind(route.status)
            .bind(route.created_at)
            .execute(&mut *tx)
            .await?;

            for stop in &route.stops {
                let updated = sqlx::query("UPDATE orders SET status = 'routed' WHERE id = $1 AND status = 'pending'")
                    .bind(&stop.order_id)
                    .execute(&mut *tx)
                    .await?;

                // El rollback ocurre al soltar la transacción
                if updated.rows_affected() == 0 {
                    log::warn!("⚠️ Pedido {} ya no está pendiente, plan descartado", stop.order_id);
                    return Err(AppError::Conflict(format!(
                        "Order '{}' is no longer pending",
                        stop.order_id
                    )));
                }

                sqlx::query(
                    r#"
                    INSERT INTO route_stops (id, route_id, customer_id, order_id, stop_number,
                                             estimated_arrival, distance_from_previous_km, status,
                                             completed_at, latitude, longitude)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                    "#,
                )
                .bind(&stop.id)
                .bind(&stop.route_id)
                .bind(&stop.customer_id)
                .bind(&stop.order_id)
                .bind(stop.stop_number)
                .bind(stop.estimated_arrival)
                .bind(stop.distance_from_previous_km)
                .bind(stop.status)
                .bind(stop.completed_at)
                .bind(stop.coordinates.map(|c| c.lat))
                .bind(stop.coordinates.map(|c| c.lng))
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_route(&self, id: &str) -> AppResult<Option<Route>> {
        let row = sqlx::query_as::<_, RouteRow>(&format!("SELECT {} FROM routes WHERE id = $1", ROUTE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.attach_stops(vec![row]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    async fn list_routes(&self, filters: &RouteFilters) -> AppResult<Vec<Route>> {
        let rows = sqlx::query_as::<_, RouteRow>(&format!(
            r#"
            SELECT {}
            FROM routes
            WHERE ($1::TEXT IS NULL OR location_id = $1)
              AND ($2::route_status IS NULL OR status = $2)
              AND ($3::DATE IS NULL OR date = $3)
              AND ($4::TEXT IS NULL OR driver_id = $4)
            ORDER BY date DESC, created_at, name
            "#,
            ROUTE_COLUMNS
        ))
        .bind(filters.location_id.as_deref())
        .bind(filters.status)
        .bind(filters.date)
        .bind(filters.driver_id.as_deref())
        .fetch_all(&self.pool)
        .await?;

        self.attach_stops(rows).await
    }

    async fn update_route_status(&self, id: &str, from: RouteStatus, to: RouteStatus) -> AppResult<Route> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE routes SET status = $1 WHERE id = $2 AND status = $3")
            .bind(to)
            .bind(id)
            .bind(from)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "Route '{}' is no longer '{}'",
                id,
                from.as_str()
            )));
        }

        if to == RouteStatus::Cancelled {
            let released = sqlx::query(
                r#"
                UPDATE orders SET status = 'pending'
                WHERE status = 'routed'
                  AND id IN (SELECT order_id FROM route_stops WHERE route_id = $1 AND status = 'pending')
                "#,
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
            log::info!("↩️ Ruta {} cancelada, {} pedidos vuelven a pendiente", id, released.rows_affected());
        }

        tx.commit().await?;
        self.require_route(id).await
    }

    async fn complete_stop(&self, route_id: &str, stop_id: &str, at: DateTime<Utc>) -> AppResult<Route> {
        let mut tx = self.pool.begin().await?;

        let status: Option<(RouteStatus,)> = sqlx::query_as("SELECT status FROM routes WHERE id = $1 FOR UPDATE")
            .bind(route_id)
            .fetch_optional(&mut *tx)
            .await?;

        match status {
            None => return Err(not_found_error("Route", route_id)),
            Some((RouteStatus::Active,)) => {}
            Some((other,)) => {
                return Err(AppError::Conflict(format!(
                    "Route '{}' is '{}', stops can only be completed on active routes",
                    route_id,
                    other.as_str()
                )))
            }
        }

        let completed: Option<(String,)> = sqlx::query_as(
            r#"
            UPDATE route_stops SET status = 'completed', completed_at = $1
            WHERE id = $2 AND route_id = $3 AND status = 'pending'
            RETURNING order_id
            "#,
        )
        .bind(at)
        .bind(stop_id)
        .bind(route_id)
        .fetch_optional(&mut *tx)
        .await?;

        let order_id = match completed {
            Some((order_id,)) => order_id,
            None => {
                let exists: (bool,) =
                    sqlx::query_as("SELECT EXISTS(SELECT 1 FROM route_stops WHERE id = $1 AND route_id = $2)")
                        .bind(stop_id)
                        .bind(route_id)
                        .fetch_one(&mut *tx)
                        .await?;
                return Err(if exists.0 {
                    AppError::Conflict(format!("Stop '{}' is already completed", stop_id))
                } else {
                    not_found_error("Stop", stop_id)
                });
            }
        };

        sqlx::query("UPDATE orders SET status = 'delivered' WHERE id = $1")
            .bind(&order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        self.require_route(route_id).await
    }

    async fn record_driver_location(&self, location: &DriverLocation) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO driver_locations (driver_id, lat, lng, timestamp, route_id, speed, heading, accuracy)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&location.driver_id)
        .bind(location.lat)
        .bind(location.lng)
        .bind(location.timestamp)
        .bind(&location.route_id)
        .bind(location.speed)
        .bind(location.heading)
        .bind(location.accuracy)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest_driver_location(&self, driver_id: &str) -> AppResult<Option<DriverLocation>> {
        let location = sqlx::query_as::<_, DriverLocation>(
            r#"
            SELECT driver_id, lat, lng, timestamp, route_id, speed, heading, accuracy
            FROM driver_locations
            WHERE driver_id = $1
            ORDER BY timestamp DESC
            LIMIT 1
            "#,
        )
        .bind(driver_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, role, driver_id FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
