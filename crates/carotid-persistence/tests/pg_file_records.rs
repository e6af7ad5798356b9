//! Paridad de `PgFileRecordStore` con el backend en memoria (requiere DATABASE_URL).

use carotid_core::{FileRecordStore, PipelineError};
use carotid_domain::{MeshStatus, NewMeshArtifact};
use carotid_persistence::{build_pool, DbConfig, PgFileRecordStore, PoolProvider};
use chrono::{Duration, Utc};
use uuid::Uuid;

fn store() -> Option<PgFileRecordStore<PoolProvider>> {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL no definido: omitiendo test");
        return None;
    }
    let cfg = DbConfig::from_env().expect("config");
    let pool = build_pool(&cfg.url, 1, 2).expect("pool");
    Some(PgFileRecordStore::new(PoolProvider { pool }))
}

fn fields(patient_id: Option<i64>, offset_ms: i64) -> NewMeshArtifact {
    let unique = Uuid::new_v4();
    NewMeshArtifact { patient_id,
                      original_filename: "neck.stl".into(),
                      stored_name: format!("{unique}-neck.stl"),
                      storage_location: format!("/tmp/{unique}-neck.stl"),
                      byte_size: 128,
                      uploaded_at: Utc::now() + Duration::milliseconds(offset_ms) }
}

#[test]
fn create_read_update_roundtrip() {
    let Some(store) = store() else { return };
    let id = store.create_file_record(fields(None, 0)).expect("create");
    let art = store.get_by_id(id).expect("get").expect("exists");
    assert_eq!(art.status, MeshStatus::Uploaded);
    assert_eq!(art.byte_size, 128);
    store.update_status(id, MeshStatus::Converting).expect("update");
    assert_eq!(store.get_by_id(id).unwrap().unwrap().status, MeshStatus::Converting);
}

#[test]
fn unknown_id_behaves_like_memory_backend() {
    let Some(store) = store() else { return };
    let id = Uuid::new_v4();
    assert!(store.get_by_id(id).unwrap().is_none());
    assert_eq!(store.update_status(id, MeshStatus::Failed), Err(PipelineError::NotFound(id)));
}

#[test]
fn patient_listing_is_newest_first() {
    let Some(store) = store() else { return };
    let patient = (Utc::now().timestamp_micros() % 1_000_000_000) + 1_000_000_000;
    let older = store.create_file_record(fields(Some(patient), -1000)).unwrap();
    let newer = store.create_file_record(fields(Some(patient), 0)).unwrap();
    let ids: Vec<Uuid> = store.get_by_patient(patient).unwrap().into_iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![newer, older]);
}
