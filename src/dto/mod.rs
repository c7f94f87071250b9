//! Data Transfer Objects
//!
//! Este módulo contiene los DTOs de entrada y salida de la API.

pub mod api_response;
pub mod auth_dto;
pub mod driver_dto;
pub mod order_dto;
pub mod route_dto;

pub use api_response::ApiResponse;
