//! Artifact de malla subido y su ciclo de vida.
//!
//! Transiciones válidas (`*` = terminal):
//! - `Uploaded` -> `Converting` -> `Converted` -> `Predicting` -> `Predicted*`
//! - cualquier estado no terminal -> `Failed*`
//!
//! No hay reversiones: una nueva subida crea siempre un artifact nuevo.
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::DomainError;

/// Estado del artifact dentro del pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshStatus {
    /// Malla persistida, aún sin convertir.
    Uploaded,
    /// Conversión a nube de puntos en curso.
    Converting,
    /// Nube de puntos disponible.
    Converted,
    /// Predicción hemodinámica en curso.
    Predicting,
    /// Predicción disponible (terminal).
    Predicted,
    /// Error irrecuperable (terminal).
    Failed,
}

impl MeshStatus {
    pub const ALL: [MeshStatus; 6] = [MeshStatus::Uploaded,
                                      MeshStatus::Converting,
                                      MeshStatus::Converted,
                                      MeshStatus::Predicting,
                                      MeshStatus::Predicted,
                                      MeshStatus::Failed];

    pub fn is_terminal(self) -> bool {
        matches!(self, MeshStatus::Predicted | MeshStatus::Failed)
    }

    /// Indica si `self -> next` es una transición legal.
    pub fn can_transition_to(self, next: MeshStatus) -> bool {
        use MeshStatus::*;
        match (self, next) {
            (Uploaded, Converting) | (Converting, Converted) | (Converted, Predicting) | (Predicting, Predicted) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Representación estable usada en persistencia y logs.
    pub fn as_str(self) -> &'static str {
        match self {
            MeshStatus::Uploaded => "uploaded",
            MeshStatus::Converting => "converting",
            MeshStatus::Converted => "converted",
            MeshStatus::Predicting => "predicting",
            MeshStatus::Predicted => "predicted",
            MeshStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for MeshStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeshStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MeshStatus::ALL.iter()
                       .copied()
                       .find(|st| st.as_str() == s)
                       .ok_or_else(|| DomainError::Validation(format!("estado desconocido: {s}")))
    }
}

/// Formatos de malla aceptados en la subida.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeshFormat {
    Stl,
}

impl MeshFormat {
    /// Detecta el formato a partir de la extensión del nombre original.
    pub fn from_filename(filename: &str) -> Result<Self, DomainError> {
        let ext = Path::new(filename).extension()
                                     .and_then(|e| e.to_str())
                                     .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("stl") => Ok(MeshFormat::Stl),
            _ => Err(DomainError::Validation(format!("formato de malla no soportado: {filename}"))),
        }
    }
}

/// Campos necesarios para crear el registro de un artifact (antes de tener id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMeshArtifact {
    pub patient_id: Option<i64>,
    pub original_filename: String,
    /// Nombre con el que quedó guardado (resistente a colisiones).
    pub stored_name: String,
    pub storage_location: String,
    pub byte_size: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// Malla subida. Sólo se modifica mediante transiciones de `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshArtifact {
    pub id: Uuid,
    pub patient_id: Option<i64>,
    pub original_filename: String,
    pub stored_name: String,
    pub storage_location: String,
    pub byte_size: u64,
    pub uploaded_at: DateTime<Utc>,
    pub status: MeshStatus,
}

impl MeshArtifact {
    /// Materializa un registro nuevo en estado `Uploaded`.
    pub fn from_new(id: Uuid, fields: NewMeshArtifact) -> Self {
        Self { id,
               patient_id: fields.patient_id,
               original_filename: fields.original_filename,
               stored_name: fields.stored_name,
               storage_location: fields.storage_location,
               byte_size: fields.byte_size,
               uploaded_at: fields.uploaded_at,
               status: MeshStatus::Uploaded }
    }

    /// Nombre base (sin extensión) del archivo guardado; las salidas de los
    /// scripts externos se nombran a partir de él.
    pub fn base_name(&self) -> &str {
        Path::new(&self.stored_name).file_stem()
                                    .and_then(|s| s.to_str())
                                    .unwrap_or(&self.stored_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_are_legal() {
        assert!(MeshStatus::Uploaded.can_transition_to(MeshStatus::Converting));
        assert!(MeshStatus::Converting.can_transition_to(MeshStatus::Converted));
        assert!(MeshStatus::Converted.can_transition_to(MeshStatus::Predicting));
        assert!(MeshStatus::Predicting.can_transition_to(MeshStatus::Predicted));
    }

    #[test]
    fn no_skips_or_reversals() {
        assert!(!MeshStatus::Uploaded.can_transition_to(MeshStatus::Predicting));
        assert!(!MeshStatus::Converted.can_transition_to(MeshStatus::Uploaded));
        assert!(!MeshStatus::Converting.can_transition_to(MeshStatus::Converting));
        assert!(!MeshStatus::Predicted.can_transition_to(MeshStatus::Converting));
    }

    #[test]
    fn failed_reachable_only_from_non_terminal() {
        for st in MeshStatus::ALL {
            assert_eq!(st.can_transition_to(MeshStatus::Failed), !st.is_terminal(), "{st}");
        }
    }

    #[test]
    fn status_string_roundtrip() {
        for st in MeshStatus::ALL {
            assert_eq!(st.as_str().parse::<MeshStatus>().unwrap(), st);
        }
        assert!("processing".parse::<MeshStatus>().is_err());
    }

    #[test]
    fn mesh_format_detection() {
        assert_eq!(MeshFormat::from_filename("MaChunLan30.stl").unwrap(), MeshFormat::Stl);
        assert_eq!(MeshFormat::from_filename("CAROTID.STL").unwrap(), MeshFormat::Stl);
        assert!(MeshFormat::from_filename("carotid.obj").is_err());
        assert!(MeshFormat::from_filename("stl").is_err());
    }

    #[test]
    fn base_name_strips_extension() {
        let art = MeshArtifact::from_new(Uuid::new_v4(),
                                         NewMeshArtifact { patient_id: None,
                                                           original_filename: "a.stl".into(),
                                                           stored_name: "1700-abc-a.stl".into(),
                                                           storage_location: "/tmp/1700-abc-a.stl".into(),
                                                           byte_size: 3,
                                                           uploaded_at: Utc::now() });
        assert_eq!(art.base_name(), "1700-abc-a");
        assert_eq!(art.status, MeshStatus::Uploaded);
    }
}
