use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::dto::order_dto::CreateOrderRequest;
use crate::models::{Order, OrderFilters, OrderStatus};
use crate::repositories::DeliveryStore;
use crate::utils::errors::{not_found_error, AppResult};

pub struct OrderService {
    store: Arc<dyn DeliveryStore>,
}

impl OrderService {
    pub fn new(store: Arc<dyn DeliveryStore>) -> Self {
        Self { store }
    }

    /// Crear un pedido pendiente en la planta del cliente
    pub async fn create_order(&self, request: CreateOrderRequest) -> AppResult<Order> {
        request.validate()?;

        let customer = self
            .store
            .get_customer(&request.customer_id)
            .await?
            .ok_or_else(|| not_found_error("Customer", &request.customer_id))?;

        let order = Order {
            id: Uuid::new_v4().to_string(),
            customer_id: customer.id,
            location_id: customer.location_id,
            quantity: request.quantity,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };

        let order = self.store.create_order(order).await?;
        log::info!("🧊 Pedido {} creado: {} bolsas para {}", order.id, order.quantity, order.customer_id);

        Ok(order)
    }

    pub async fn list_orders(&self, filters: &OrderFilters) -> AppResult<Vec<Order>> {
        self.store.list_orders(filters).await
    }
}
