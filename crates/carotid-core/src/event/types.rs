//! Eventos del ciclo de vida de un artifact.
//!
//! Registro append-only para inspección del operador: cada transición de
//! estado y cada resultado de job queda anotado con su diagnóstico.
use std::path::PathBuf;

use carotid_domain::{Diagnostic, JobKind, MeshStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum LifecycleEventKind {
    /// Primer evento de un artifact.
    Registered { stored_name: String, byte_size: u64 },
    /// Artifact creado a partir de uno fallido.
    Resubmitted { from: Uuid },
    StatusChanged { from: MeshStatus, to: MeshStatus },
    JobSucceeded { job: JobKind, output: PathBuf },
    JobFailed { job: JobKind, diagnostic: Diagnostic },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub seq: u64, // orden de append dentro del artifact
    pub artifact_id: Uuid,
    pub kind: LifecycleEventKind,
    pub ts: DateTime<Utc>,
}
