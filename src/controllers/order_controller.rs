use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};

use crate::dto::api_response::ApiResponse;
use crate::dto::order_dto::CreateOrderRequest;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{Order, OrderFilters, UserRole};
use crate::services::OrderService;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Crear un pedido pendiente
pub async fn create_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Order>>), AppError> {
    user.require_role(&[UserRole::Manager], "create order")?;

    let order = OrderService::new(state.store.clone()).create_order(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(order, "Order created".to_string())),
    ))
}

/// Listar pedidos
pub async fn list_orders(
    State(state): State<AppState>,
    Query(filters): Query<OrderFilters>,
) -> Result<Json<ApiResponse<Vec<Order>>>, AppError> {
    let orders = OrderService::new(state.store.clone()).list_orders(&filters).await?;
    Ok(Json(ApiResponse::success(orders)))
}
