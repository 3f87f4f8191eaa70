// src/common/validation.rs

// Regras de campo compartilhadas pela criação/edição de leads, pelo upload de CSV
// e pelo registro de atividades.

use validator::ValidateEmail;

use crate::common::error::AppError;

/// Campo obrigatório: presente e não vazio depois do trim. Devolve o valor aparado.
pub fn required_text(field: &'static str, value: Option<&str>) -> Result<String, AppError> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(AppError::invalid_field(field, format!("O campo '{field}' é obrigatório."))),
    }
}

pub fn lead_name(value: Option<&str>) -> Result<String, AppError> {
    required_text("name", value)
}

pub fn lead_email(value: Option<&str>) -> Result<String, AppError> {
    let email = required_text("email", value)?;
    if !email.validate_email() {
        return Err(AppError::invalid_field("email", "O e-mail fornecido é inválido."));
    }
    Ok(email)
}

/// Telefone com 10 dígitos; pontuação e espaços são descartados antes de salvar.
pub fn lead_phone(value: Option<&str>) -> Result<String, AppError> {
    let phone = required_text("phone", value)?;
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 10 {
        return Err(AppError::invalid_field("phone", "O telefone deve ter 10 dígitos."));
    }
    Ok(digits)
}

pub fn lead_source(value: Option<&str>) -> String {
    value.map(str::trim).unwrap_or_default().to_string()
}
