//! Utilidades de validación
//!
//! Funciones `custom` para los DTOs validados con `validator`.

use validator::ValidationError;

/// Validar que un string no esté vacío
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_blank");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar identificadores externos (`loc_2`, `cust-17`, uuids)
pub fn validate_identifier(value: &str) -> Result<(), ValidationError> {
    validate_not_blank(value)?;

    let allowed = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';
    if value.len() > 64 || !value.chars().all(allowed) {
        let mut error = ValidationError::new("identifier");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}
