//! Modelo de User
//!
//! Usuarios que consumen la API: gerentes de planta, choferes y clientes.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

/// Rol del usuario - mapea al ENUM user_role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Manager,
    Driver,
    Customer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Manager => "manager",
            UserRole::Driver => "driver",
            UserRole::Customer => "customer",
        }
    }
}

/// User principal - mapea a la tabla users
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    /// Chofer asociado cuando el rol es `driver`
    pub driver_id: Option<String>,
}
