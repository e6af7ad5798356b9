//! Almacén de metadatos de artifacts (clave-valor por id).
use carotid_domain::{MeshArtifact, MeshStatus, NewMeshArtifact};
use dashmap::DashMap;
use uuid::Uuid;

use crate::errors::PipelineError;

/// Contrato mínimo que el pipeline necesita del almacén de metadatos.
/// No se requieren garantías transaccionales entre registros.
pub trait FileRecordStore: Send + Sync {
    fn create_file_record(&self, fields: NewMeshArtifact) -> Result<Uuid, PipelineError>;
    /// `NotFound` si el id no existe.
    fn update_status(&self, id: Uuid, status: MeshStatus) -> Result<(), PipelineError>;
    fn get_by_patient(&self, patient_id: i64) -> Result<Vec<MeshArtifact>, PipelineError>;
    fn get_by_id(&self, id: Uuid) -> Result<Option<MeshArtifact>, PipelineError>;
}

#[derive(Debug, Default)]
pub struct InMemoryFileRecordStore {
    inner: DashMap<Uuid, MeshArtifact>,
}

impl InMemoryFileRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl FileRecordStore for InMemoryFileRecordStore {
    fn create_file_record(&self, fields: NewMeshArtifact) -> Result<Uuid, PipelineError> {
        let id = Uuid::new_v4();
        self.inner.insert(id, MeshArtifact::from_new(id, fields));
        Ok(id)
    }

    fn update_status(&self, id: Uuid, status: MeshStatus) -> Result<(), PipelineError> {
        let mut entry = self.inner.get_mut(&id).ok_or(PipelineError::NotFound(id))?;
        entry.status = status;
        Ok(())
    }

    fn get_by_patient(&self, patient_id: i64) -> Result<Vec<MeshArtifact>, PipelineError> {
        Ok(self.inner
               .iter()
               .filter(|e| e.patient_id == Some(patient_id))
               .map(|e| e.value().clone())
               .collect())
    }

    fn get_by_id(&self, id: Uuid) -> Result<Option<MeshArtifact>, PipelineError> {
        Ok(self.inner.get(&id).map(|e| e.value().clone()))
    }
}
