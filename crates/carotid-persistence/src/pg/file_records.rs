use carotid_core::{FileRecordStore, PipelineError};
use carotid_domain::{MeshArtifact, MeshStatus, NewMeshArtifact};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::debug;
use uuid::Uuid;

use super::{with_retry, ConnectionProvider};
use crate::error::PersistenceError;
use crate::schema::mesh_artifacts;

/// Fila leída de `mesh_artifacts`.
#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = mesh_artifacts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MeshArtifactRow {
    pub id: Uuid,
    pub patient_id: Option<i64>,
    pub original_filename: String,
    pub stored_name: String,
    pub storage_location: String,
    pub byte_size: i64,
    pub uploaded_at: DateTime<Utc>,
    pub status: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = mesh_artifacts)]
pub struct NewMeshArtifactRow<'a> {
    pub id: Uuid,
    pub patient_id: Option<i64>,
    pub original_filename: &'a str,
    pub stored_name: &'a str,
    pub storage_location: &'a str,
    pub byte_size: i64,
    pub uploaded_at: DateTime<Utc>,
    pub status: &'a str,
}

impl TryFrom<MeshArtifactRow> for MeshArtifact {
    type Error = PersistenceError;

    fn try_from(row: MeshArtifactRow) -> Result<Self, Self::Error> {
        let status: MeshStatus = row.status
                                    .parse()
                                    .map_err(|e| PersistenceError::CorruptRow(format!("{}: {e}", row.id)))?;
        let byte_size = u64::try_from(row.byte_size).map_err(|_| {
                                                         PersistenceError::CorruptRow(format!("{}: byte_size negativo", row.id))
                                                     })?;
        Ok(MeshArtifact { id: row.id,
                          patient_id: row.patient_id,
                          original_filename: row.original_filename,
                          stored_name: row.stored_name,
                          storage_location: row.storage_location,
                          byte_size,
                          uploaded_at: row.uploaded_at,
                          status })
    }
}

/// `FileRecordStore` sobre Postgres.
pub struct PgFileRecordStore<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgFileRecordStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P: ConnectionProvider> FileRecordStore for PgFileRecordStore<P> {
    fn create_file_record(&self, fields: NewMeshArtifact) -> Result<Uuid, PipelineError> {
        let id = Uuid::new_v4();
        let byte_size = i64::try_from(fields.byte_size).map_err(|_| {
                                                            PipelineError::Validation(format!("tamaño fuera de rango: {}",
                                                                                              fields.byte_size))
                                                        })?;
        let row = NewMeshArtifactRow { id,
                                       patient_id: fields.patient_id,
                                       original_filename: &fields.original_filename,
                                       stored_name: &fields.stored_name,
                                       storage_location: &fields.storage_location,
                                       byte_size,
                                       uploaded_at: fields.uploaded_at,
                                       status: MeshStatus::Uploaded.as_str() };
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::insert_into(mesh_artifacts::table).values(&row).execute(&mut conn)?;
            Ok(())
        })?;
        debug!("mesh_artifacts: insertado {id}");
        Ok(id)
    }

    fn update_status(&self, id: Uuid, status: MeshStatus) -> Result<(), PipelineError> {
        let updated = with_retry(|| {
            let mut conn = self.provider.connection()?;
            Ok(diesel::update(mesh_artifacts::table.find(id)).set(mesh_artifacts::status.eq(status.as_str()))
                                                             .execute(&mut conn)?)
        })?;
        if updated == 0 {
            return Err(PipelineError::NotFound(id));
        }
        Ok(())
    }

    fn get_by_patient(&self, patient_id: i64) -> Result<Vec<MeshArtifact>, PipelineError> {
        let rows = with_retry(|| {
            let mut conn = self.provider.connection()?;
            Ok(mesh_artifacts::table.filter(mesh_artifacts::patient_id.eq(patient_id))
                                    .order(mesh_artifacts::uploaded_at.desc())
                                    .select(MeshArtifactRow::as_select())
                                    .load(&mut conn)?)
        })?;
        rows.into_iter()
            .map(|r| MeshArtifact::try_from(r).map_err(PipelineError::from))
            .collect()
    }

    fn get_by_id(&self, id: Uuid) -> Result<Option<MeshArtifact>, PipelineError> {
        let row = with_retry(|| {
            let mut conn = self.provider.connection()?;
            Ok(mesh_artifacts::table.find(id)
                                    .select(MeshArtifactRow::as_select())
                                    .first(&mut conn)
                                    .optional()?)
        })?;
        row.map(MeshArtifact::try_from).transpose().map_err(PipelineError::from)
    }
}
