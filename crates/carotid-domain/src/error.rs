use thiserror::Error;

/// Errores del dominio (entradas inválidas o degeneradas).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Validación fallida: {0}")]
    Validation(String),
    #[error("Entrada vacía: {0}")]
    EmptyInput(String),
}
