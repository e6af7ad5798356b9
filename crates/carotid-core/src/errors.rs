//! Taxonomía de errores del pipeline.

use std::path::PathBuf;

use carotid_domain::{Diagnostic, DomainError, MeshStatus};
use carotid_engine::InvokerError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    /// Entrada del llamador mal formada. No se reintenta.
    #[error("Validación fallida: {0}")]
    Validation(String),
    /// Operación ilegal para el estado actual; el estado no cambia.
    #[error("Operación `{operation}` inválida para {id} en estado {current}")]
    InvalidState {
        id: Uuid,
        current: MeshStatus,
        operation: &'static str,
    },
    #[error("Artifact no encontrado: {0}")]
    NotFound(Uuid),
    /// El proceso externo falló; el artifact pasa a `failed`.
    #[error("Error de ejecución: {}", .0.reason)]
    Execution(Diagnostic),
    /// El proceso terminó bien pero sin la salida esperada; mismo efecto que `Execution`.
    #[error("Salida esperada ausente: {}", expected.display())]
    OutputMissing { expected: PathBuf, diagnostic: Diagnostic },
    #[error("Entrada vacía: {0}")]
    EmptyInput(String),
    #[error("Error de almacenamiento: {0}")]
    Storage(String),
    #[error("Error del almacén de metadatos: {0}")]
    Store(String),
}

/// Clase gruesa de error, para logs y códigos de salida.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    State,
    NotFound,
    Execution,
    Backend,
}

impl ErrorClass {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::Validation => "validation",
            ErrorClass::State => "state",
            ErrorClass::NotFound => "not_found",
            ErrorClass::Execution => "execution",
            ErrorClass::Backend => "backend",
        }
    }
}

impl PipelineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PipelineError::Validation(_) | PipelineError::EmptyInput(_) => ErrorClass::Validation,
            PipelineError::InvalidState { .. } => ErrorClass::State,
            PipelineError::NotFound(_) => ErrorClass::NotFound,
            PipelineError::Execution(_) | PipelineError::OutputMissing { .. } => ErrorClass::Execution,
            PipelineError::Storage(_) | PipelineError::Store(_) => ErrorClass::Backend,
        }
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            PipelineError::Execution(d) | PipelineError::OutputMissing { diagnostic: d, .. } => Some(d),
            _ => None,
        }
    }
}

impl From<DomainError> for PipelineError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(m) => PipelineError::Validation(m),
            DomainError::EmptyInput(m) => PipelineError::EmptyInput(m),
        }
    }
}

/// Los fallos previos al proceso (configuración, lanzamiento) también dejan
/// el artifact en `failed`, así que se reportan como `Execution`.
impl From<InvokerError> for PipelineError {
    fn from(e: InvokerError) -> Self {
        match e {
            InvokerError::Execution(d) => PipelineError::Execution(d),
            InvokerError::OutputMissing { expected, diagnostic } => PipelineError::OutputMissing { expected, diagnostic },
            other @ (InvokerError::Handoff { .. } | InvokerError::Spawn { .. }) => {
                PipelineError::Execution(Diagnostic { reason: other.to_string(), ..Default::default() })
            }
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        PipelineError::Storage(e.to_string())
    }
}
