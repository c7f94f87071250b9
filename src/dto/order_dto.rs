use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::validation::validate_identifier;

/// Request para crear un pedido pendiente
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(custom = "validate_identifier")]
    pub customer_id: String,
    #[validate(range(min = 1, max = 10000))]
    pub quantity: i32,
}
