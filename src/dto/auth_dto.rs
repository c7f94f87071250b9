use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::user::UserRole;

// Login request
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 100))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub role: UserRole,
}

impl LoginResponse {
    pub fn bearer(token: String, expires_in: u64, role: UserRole) -> Self {
        Self {
            token,
            token_type: "Bearer".to_string(),
            expires_in,
            role,
        }
    }
}
