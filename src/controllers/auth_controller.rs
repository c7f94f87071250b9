use axum::{extract::State, response::Json};

use crate::dto::auth_dto::{LoginRequest, LoginResponse};
use crate::services::AuthService;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Endpoint de login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let response = AuthService::new(state.store.clone(), state.jwt.clone())
        .login(payload)
        .await?;
    Ok(Json(response))
}
