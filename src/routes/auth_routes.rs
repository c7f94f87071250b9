use axum::{routing::post, Router};

use crate::controllers::auth_controller::login;
use crate::state::AppState;

/// Configura las rutas de autenticación (públicas)
pub fn create_auth_routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}
