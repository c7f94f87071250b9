//! Modelo de Order
//!
//! Pedido pendiente de entrega. La ubicación de salida es la del cliente.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

/// Estado del pedido - mapea al ENUM order_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Routed,
    Delivered,
    Cancelled,
}

/// Order principal - mapea a la tabla orders
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub location_id: String,
    /// Bolsas de hielo
    pub quantity: i32,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Filtros para búsqueda de pedidos
#[derive(Debug, Default, Clone, Deserialize)]
pub struct OrderFilters {
    pub location_id: Option<String>,
    pub status: Option<OrderStatus>,
}

impl OrderFilters {
    pub fn matches(&self, order: &Order) -> bool {
        self.location_id.as_ref().map_or(true, |l| &order.location_id == l)
            && self.status.map_or(true, |s| order.status == s)
    }
}
