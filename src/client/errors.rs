//! Errores del cliente HTTP

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::utils::errors::ErrorResponse;

/// Cuerpo de error devuelto por el backend, si se pudo leer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendError {
    pub status: u16,
    pub error: Option<String>,
    pub message: Option<String>,
    pub details: Option<Value>,
    pub code: Option<String>,
}

impl BackendError {
    pub fn from_body(status: StatusCode, body: &str) -> Self {
        match serde_json::from_str::<ErrorResponse>(body) {
            Ok(parsed) => Self {
                status: status.as_u16(),
                error: Some(parsed.error),
                message: Some(parsed.message),
                details: parsed.details,
                code: parsed.code,
            },
            Err(_) => Self {
                status: status.as_u16(),
                message: loose_message(body),
                ..Default::default()
            },
        }
    }
}

/// `message` o `detail` de un cuerpo JSON parcial; si no, el texto tal cual
fn loose_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) {
        let field = fields.get("message").or_else(|| fields.get("detail"));
        match field {
            Some(Value::String(text)) => return Some(text.clone()),
            Some(Value::Null) | None => {}
            Some(other) => return Some(other.to_string()),
        }
    }

    Some(body.to_string())
}

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized ({})", .0.status)]
    Unauthorized(BackendError),

    #[error("Forbidden ({})", .0.status)]
    Forbidden(BackendError),

    #[error("Not found ({})", .0.status)]
    NotFound(BackendError),

    #[error("Bad request ({})", .0.status)]
    BadRequest(BackendError),

    #[error("Conflict ({})", .0.status)]
    Conflict(BackendError),

    #[error("Unprocessable ({})", .0.status)]
    Unprocessable(BackendError),

    #[error("Rate limited ({})", .0.status)]
    RateLimited(BackendError),

    #[error("Server error ({})", .0.status)]
    Server(BackendError),

    #[error("Invalid response body: {reason}")]
    Decode { status: u16, reason: String },
}

impl ClientError {
    /// Clasificar una respuesta no exitosa
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let backend = BackendError::from_body(status, body);
        match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized(backend),
            StatusCode::FORBIDDEN => ClientError::Forbidden(backend),
            StatusCode::NOT_FOUND => ClientError::NotFound(backend),
            StatusCode::CONFLICT => ClientError::Conflict(backend),
            StatusCode::UNPROCESSABLE_ENTITY => ClientError::Unprocessable(backend),
            StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited(backend),
            s if s.is_server_error() => ClientError::Server(backend),
            _ => ClientError::BadRequest(backend),
        }
    }

    /// Código HTTP; 0 cuando no hubo respuesta
    pub fn status(&self) -> u16 {
        match self {
            ClientError::Network(_) => 0,
            ClientError::Decode { status, .. } => *status,
            other => other.backend().map_or(0, |b| b.status),
        }
    }

    pub fn backend(&self) -> Option<&BackendError> {
        match self {
            ClientError::Unauthorized(b)
            | ClientError::Forbidden(b)
            | ClientError::NotFound(b)
            | ClientError::BadRequest(b)
            | ClientError::Conflict(b)
            | ClientError::Unprocessable(b)
            | ClientError::RateLimited(b)
            | ClientError::Server(b) => Some(b),
            ClientError::Network(_) | ClientError::Decode { .. } => None,
        }
    }

    /// Mensaje del backend, si lo hubo
    pub fn backend_message(&self) -> Option<&str> {
        self.backend().and_then(|b| b.message.as_deref())
    }

    /// Código de error del backend (`NO_VEHICLES_AVAILABLE`, `INFEASIBLE`, ...)
    pub fn backend_code(&self) -> Option<&str> {
        self.backend().and_then(|b| b.code.as_deref())
    }

    /// Texto para mostrar al usuario
    pub fn user_message(&self) -> &'static str {
        match self {
            ClientError::Network(_) => "No se pudo conectar con el servidor. Revisa tu conexión.",
            ClientError::Unauthorized(_) => "Tu sesión expiró. Inicia sesión de nuevo.",
            ClientError::Forbidden(_) => "No tienes permiso para realizar esta acción.",
            ClientError::NotFound(_) => "El recurso solicitado no existe.",
            ClientError::BadRequest(_) => "La solicitud no es válida.",
            ClientError::Conflict(_) => "La operación entra en conflicto con el estado actual.",
            ClientError::Unprocessable(_) => match self.backend_code() {
                Some("NO_VEHICLES_AVAILABLE") => "No hay vehículos disponibles para planificar.",
                Some("INFEASIBLE") => "No se pudo armar ninguna ruta con los pedidos actuales.",
                _ => "La solicitud no se pudo procesar.",
            },
            ClientError::RateLimited(_) => "Demasiadas solicitudes. Espera un momento.",
            ClientError::Server(_) => "Error del servidor. Intenta más tarde.",
            ClientError::Decode { .. } => "Respuesta inesperada del servidor.",
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_status_and_reads_backend_body() {
        let body = r#"{"error":"Unprocessable","message":"No vehicles at loc_9","code":"NO_VEHICLES_AVAILABLE"}"#;
        let err = ClientError::from_response(StatusCode::UNPROCESSABLE_ENTITY, body);

        assert!(matches!(err, ClientError::Unprocessable(_)));
        assert_eq!(err.status(), 422);
        assert_eq!(err.backend_message(), Some("No vehicles at loc_9"));
        assert_eq!(err.user_message(), "No hay vehículos disponibles para planificar.");
    }

    #[test]
    fn test_plain_text_body_is_kept_as_message() {
        let err = ClientError::from_response(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(err, ClientError::Server(_)));
        assert_eq!(err.backend_message(), Some("upstream down"));

        let err = ClientError::from_response(StatusCode::TOO_MANY_REQUESTS, "");
        assert!(matches!(err, ClientError::RateLimited(_)));
        assert_eq!(err.backend_message(), None);
    }

    #[test]
    fn test_partial_json_body_yields_bare_message() {
        let err = ClientError::from_response(StatusCode::NOT_FOUND, r#"{"detail":"Location not found"}"#);
        assert_eq!(err.backend_message(), Some("Location not found"));

        let err = ClientError::from_response(StatusCode::BAD_REQUEST, r#"{"message":"bad location"}"#);
        assert!(matches!(err, ClientError::BadRequest(_)));
        assert_eq!(err.backend_message(), Some("bad location"));

        let err = ClientError::from_response(StatusCode::BAD_REQUEST, r#"{"detail":{"field":"lat"}}"#);
        assert_eq!(err.backend_message(), Some(r#"{"field":"lat"}"#));
    }

    #[test]
    fn test_network_error_has_status_zero() {
        let err = ClientError::Network("connection refused".to_string());
        assert_eq!(err.status(), 0);
        assert!(err.backend().is_none());
    }
}
