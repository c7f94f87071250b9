use bcrypt::verify;
use std::sync::Arc;
use validator::Validate;

use crate::dto::auth_dto::{LoginRequest, LoginResponse};
use crate::repositories::DeliveryStore;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::jwt::{generate_token, JwtConfig};

/// Servicio de autenticación
pub struct AuthService {
    store: Arc<dyn DeliveryStore>,
    jwt: JwtConfig,
}

impl AuthService {
    pub fn new(store: Arc<dyn DeliveryStore>, jwt: JwtConfig) -> Self {
        Self { store, jwt }
    }

    /// Verificar credenciales y emitir un token bearer
    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        request.validate()?;

        let user = self
            .store
            .find_user_by_username(&request.username)
            .await?
            .ok_or_else(|| {
                log::warn!("🔒 Login fallido: usuario {} no existe", request.username);
                invalid_credentials()
            })?;

        if !verify(&request.password, &user.password_hash)? {
            log::warn!("🔒 Login fallido: contraseña incorrecta para {}", user.username);
            return Err(invalid_credentials());
        }

        let token = generate_token(&user, &self.jwt)?;
        log::info!("🔑 Login exitoso: {} ({})", user.username, user.role.as_str());

        Ok(LoginResponse::bearer(token, self.jwt.expiration, user.role))
    }
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid username or password".to_string())
}
