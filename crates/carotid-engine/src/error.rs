use std::path::PathBuf;

use carotid_domain::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InvokerError {
    /// Salida no cero, señal, salida vacía o plazo vencido.
    #[error("Error de ejecución: {}", .0.reason)]
    Execution(Diagnostic),
    /// El proceso terminó bien pero no dejó el archivo esperado.
    #[error("Salida esperada ausente: {}", expected.display())]
    OutputMissing { expected: PathBuf, diagnostic: Diagnostic },
    #[error("No se pudo escribir la configuración en {}: {reason}", path.display())]
    Handoff { path: PathBuf, reason: String },
    #[error("No se pudo lanzar {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl InvokerError {
    /// Diagnóstico capturado, si el proceso llegó a ejecutarse.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            InvokerError::Execution(d) | InvokerError::OutputMissing { diagnostic: d, .. } => Some(d),
            _ => None,
        }
    }
}
