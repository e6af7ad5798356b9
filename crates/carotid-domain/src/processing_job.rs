//! Invocación de un script externo sobre un artifact y su resultado.
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Etapa del pipeline que originó el job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum JobKind {
    Conversion,
    Prediction { horizon: f64 },
}

impl JobKind {
    pub fn label(&self) -> &'static str {
        match self {
            JobKind::Conversion => "conversion",
            JobKind::Prediction { .. } => "prediction",
        }
    }
}

/// Salida capturada de un proceso externo, preservada para el operador.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// `None` si el proceso terminó por señal o no llegó a terminar.
    pub exit_code: Option<i32>,
    pub stdout: String,
    /// Primeros N bytes de stderr.
    pub stderr: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum JobOutcome {
    Pending,
    Succeeded { output_path: PathBuf, content: String, stdout: String },
    Failed { diagnostic: Diagnostic },
}

/// Job de procesamiento externo (conversión o predicción).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingJob {
    pub id: Uuid,
    pub artifact_id: Uuid,
    pub kind: JobKind,
    pub executable: PathBuf,
    /// Nombre del archivo de trabajo que se le indica al script.
    pub input_name: String,
    pub expected_output: PathBuf,
    pub outcome: JobOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ProcessingJob {
    pub fn pending(artifact_id: Uuid, kind: JobKind, executable: PathBuf, input_name: String, expected_output: PathBuf) -> Self {
        Self { id: Uuid::new_v4(),
               artifact_id,
               kind,
               executable,
               input_name,
               expected_output,
               outcome: JobOutcome::Pending,
               started_at: Utc::now(),
               finished_at: None }
    }

    pub fn succeed(mut self, output_path: PathBuf, content: String, stdout: String) -> Self {
        self.outcome = JobOutcome::Succeeded { output_path, content, stdout };
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn fail(mut self, diagnostic: Diagnostic) -> Self {
        self.outcome = JobOutcome::Failed { diagnostic };
        self.finished_at = Some(Utc::now());
        self
    }

    /// Contenido de la nube de puntos producida, si el job terminó bien.
    pub fn output_content(&self) -> Option<&str> {
        match &self.outcome {
            JobOutcome::Succeeded { content, .. } => Some(content),
            _ => None,
        }
    }
}
