//! FileLifecycleOrchestrator: máquina de estados de cada malla subida.
//!
//! Orquesta subida -> conversión -> predicción. Cada artifact tiene un único
//! escritor (mutex por id); artifacts distintos avanzan en paralelo y la
//! exclusión global alrededor del script la garantiza el invocador.
use std::sync::Arc;

use carotid_domain::{Diagnostic, FieldDomain, JobKind, MeshArtifact, MeshFormat, MeshStatus, NewMeshArtifact,
                     ProcessingJob};
use carotid_engine::{HandoffValues, ScriptRequest, ScriptRunner, ScriptSpec};
use chrono::Utc;
use dashmap::DashMap;
use indexmap::IndexMap;
use log::{error, info, warn};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::event::{LifecycleEvent, LifecycleEventKind, LifecycleEventStore};
use crate::presentation::{PointCloudView, PresentationContext};
use crate::repo::FileRecordStore;
use crate::storage::MeshStorage;
use crate::workspace::{PipelineScripts, ScriptWorkspace};

/// Límite de subida por defecto (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Parámetros fijos del orquestador.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub workspace: ScriptWorkspace,
    pub scripts: PipelineScripts,
    pub max_upload_bytes: u64,
}

/// Vista completa de un artifact para la capa de presentación.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactPresentation {
    pub artifact: MeshArtifact,
    pub point_cloud: Option<PointCloudView>,
    pub prediction: Option<IndexMap<FieldDomain, PointCloudView>>,
}

pub struct FileLifecycleOrchestrator<S, M, E, R>
    where S: MeshStorage,
          M: FileRecordStore,
          E: LifecycleEventStore,
          R: ScriptRunner
{
    storage: S,
    records: M,
    events: E,
    runner: R,
    settings: OrchestratorSettings,
    presentation: PresentationContext,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl<S, M, E, R> FileLifecycleOrchestrator<S, M, E, R>
    where S: MeshStorage,
          M: FileRecordStore,
          E: LifecycleEventStore,
          R: ScriptRunner
{
    pub fn new(storage: S, records: M, events: E, runner: R, settings: OrchestratorSettings) -> Self {
        Self { storage,
               records,
               events,
               runner,
               settings,
               presentation: PresentationContext::default(),
               locks: DashMap::new() }
    }

    pub fn records(&self) -> &M {
        &self.records
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Persiste la malla con un nombre resistente a colisiones y la registra
    /// en estado `uploaded`.
    pub async fn register_upload(&self,
                                 mesh_bytes: &[u8],
                                 original_filename: &str,
                                 patient_id: Option<i64>)
                                 -> Result<MeshArtifact, PipelineError> {
        if mesh_bytes.is_empty() {
            return Err(PipelineError::Validation("la malla está vacía".into()));
        }
        let filename = std::path::Path::new(original_filename).file_name()
                                                              .and_then(|f| f.to_str())
                                                              .ok_or_else(|| {
                                                                  PipelineError::Validation(format!("nombre de archivo inválido: {original_filename:?}"))
                                                              })?;
        MeshFormat::from_filename(filename)?;
        let byte_size = mesh_bytes.len() as u64;
        if byte_size > self.settings.max_upload_bytes {
            return Err(PipelineError::Validation(format!("la malla ocupa {byte_size} bytes, máximo {}",
                                                         self.settings.max_upload_bytes)));
        }

        let stored_name = stored_name_for(mesh_bytes, filename);
        let storage_location = self.storage.save(mesh_bytes, &stored_name).await?;
        let fields = NewMeshArtifact { patient_id,
                                       original_filename: filename.to_string(),
                                       stored_name: stored_name.clone(),
                                       storage_location,
                                       byte_size,
                                       uploaded_at: Utc::now() };
        let id = self.records.create_file_record(fields.clone())?;
        self.events.append_kind(id, LifecycleEventKind::Registered { stored_name, byte_size });
        info!("artifact {id} registrado ({filename}, {byte_size} bytes)");
        Ok(MeshArtifact::from_new(id, fields))
    }

    /// `uploaded -> converting -> converted`, o `failed` si el script falla.
    pub async fn begin_conversion(&self, artifact_id: Uuid) -> Result<ProcessingJob, PipelineError> {
        let lock = self.artifact_lock(artifact_id);
        let outcome = {
            let _writer = lock.lock().await;
            self.convert_locked(artifact_id).await
        };
        drop(lock);
        self.release_lock(artifact_id);
        outcome
    }

    async fn convert_locked(&self, artifact_id: Uuid) -> Result<ProcessingJob, PipelineError> {
        let mut artifact = self.load(artifact_id)?;
        self.require(&artifact, MeshStatus::Uploaded, "begin_conversion")?;
        self.transition(&mut artifact, MeshStatus::Converting)?;
        let guard = StageGuard::arm(&self.records, &self.events, artifact_id, MeshStatus::Converting);

        let base = artifact.base_name().to_string();
        let input = ScriptWorkspace::conversion_input(&artifact.stored_name);
        let output = ScriptWorkspace::conversion_output_name(&base);
        let staged = async {
            self.settings.workspace.ensure().await?;
            self.storage
                .copy(&artifact.storage_location, &self.settings.workspace.resolve(&input))
                .await
        };
        let staged = staged.await;
        if let Err(e) = staged {
            return self.abort_stage(guard, &mut artifact, JobKind::Conversion, e);
        }
        let converter = self.settings.scripts.converter.clone();
        let outcome = self.run_stage(&mut artifact, converter, JobKind::Conversion, input, None, &output, MeshStatus::Converted)
                          .await;
        guard.disarm();
        outcome
    }

    /// `converted -> predicting -> predicted`, o `failed` si el script falla.
    pub async fn begin_prediction(&self, artifact_id: Uuid, horizon: f64) -> Result<ProcessingJob, PipelineError> {
        if !horizon.is_finite() || horizon < 0.0 {
            return Err(PipelineError::Validation(format!("horizonte inválido: {horizon}")));
        }
        let lock = self.artifact_lock(artifact_id);
        let outcome = {
            let _writer = lock.lock().await;
            self.predict_locked(artifact_id, horizon).await
        };
        drop(lock);
        self.release_lock(artifact_id);
        outcome
    }

    async fn predict_locked(&self, artifact_id: Uuid, horizon: f64) -> Result<ProcessingJob, PipelineError> {
        let mut artifact = self.load(artifact_id)?;
        self.require(&artifact, MeshStatus::Converted, "begin_prediction")?;
        self.transition(&mut artifact, MeshStatus::Predicting)?;
        let guard = StageGuard::arm(&self.records, &self.events, artifact_id, MeshStatus::Predicting);

        let base = artifact.base_name().to_string();
        let input = ScriptWorkspace::conversion_output_name(&base);
        let output = ScriptWorkspace::prediction_output_name(&base);
        if let Err(e) = self.settings.workspace.ensure().await {
            return self.abort_stage(guard, &mut artifact, JobKind::Prediction { horizon }, e);
        }
        let predictor = self.settings.scripts.predictor.clone();
        let outcome = self.run_stage(&mut artifact,
                                     predictor,
                                     JobKind::Prediction { horizon },
                                     input,
                                     Some(horizon),
                                     &output,
                                     MeshStatus::Predicted)
                          .await;
        guard.disarm();
        outcome
    }

    pub fn get_status(&self, artifact_id: Uuid) -> Result<MeshStatus, PipelineError> {
        Ok(self.load(artifact_id)?.status)
    }

    pub fn get_artifact(&self, artifact_id: Uuid) -> Result<MeshArtifact, PipelineError> {
        self.load(artifact_id)
    }

    /// Artifacts del paciente, el más reciente primero.
    pub fn files_for_patient(&self, patient_id: i64) -> Result<Vec<MeshArtifact>, PipelineError> {
        let mut files = self.records.get_by_patient(patient_id)?;
        files.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(files)
    }

    /// Crea un artifact nuevo con los bytes de uno fallido. El original sigue en `failed`.
    pub async fn resubmit(&self, failed_id: Uuid) -> Result<MeshArtifact, PipelineError> {
        let failed = self.load(failed_id)?;
        self.require(&failed, MeshStatus::Failed, "resubmit")?;
        let bytes = self.storage.read(&failed.storage_location).await?;
        let fresh = self.register_upload(&bytes, &failed.original_filename, failed.patient_id).await?;
        self.events.append_kind(fresh.id, LifecycleEventKind::Resubmitted { from: failed_id });
        info!("artifact {failed_id} reenviado como {}", fresh.id);
        Ok(fresh)
    }

    pub fn events_for(&self, artifact_id: Uuid) -> Vec<LifecycleEvent> {
        self.events.list(artifact_id)
    }

    /// Lee las salidas disponibles según el estado y prepara las vistas.
    pub async fn present(&self, artifact_id: Uuid) -> Result<ArtifactPresentation, PipelineError> {
        let artifact = self.load(artifact_id)?;
        let base = artifact.base_name().to_string();
        let ws = &self.settings.workspace;
        let point_cloud = match artifact.status {
            MeshStatus::Converted | MeshStatus::Predicting | MeshStatus::Predicted => {
                let text = tokio::fs::read_to_string(ws.resolve(&ScriptWorkspace::conversion_output_name(&base))).await?;
                Some(self.presentation.geometry_view(&text)?)
            }
            _ => None,
        };
        let prediction = match artifact.status {
            MeshStatus::Predicted => {
                let text = tokio::fs::read_to_string(ws.resolve(&ScriptWorkspace::prediction_output_name(&base))).await?;
                Some(self.presentation.prediction_views(&text)?)
            }
            _ => None,
        };
        Ok(ArtifactPresentation { artifact, point_cloud, prediction })
    }

    fn artifact_lock(&self, id: Uuid) -> Arc<Mutex<()>> {
        self.locks.entry(id).or_default().clone()
    }

    /// Quita el mutex del mapa cuando nadie más lo retiene.
    fn release_lock(&self, id: Uuid) {
        self.locks.remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);
    }

    fn load(&self, id: Uuid) -> Result<MeshArtifact, PipelineError> {
        self.records.get_by_id(id)?.ok_or(PipelineError::NotFound(id))
    }

    fn require(&self, artifact: &MeshArtifact, expected: MeshStatus, operation: &'static str) -> Result<(), PipelineError> {
        if artifact.status != expected {
            return Err(PipelineError::InvalidState { id: artifact.id, current: artifact.status, operation });
        }
        Ok(())
    }

    fn transition(&self, artifact: &mut MeshArtifact, next: MeshStatus) -> Result<(), PipelineError> {
        let from = artifact.status;
        if !from.can_transition_to(next) {
            return Err(PipelineError::InvalidState { id: artifact.id, current: from, operation: next.as_str() });
        }
        self.records.update_status(artifact.id, next)?;
        artifact.status = next;
        self.events.append_kind(artifact.id, LifecycleEventKind::StatusChanged { from, to: next });
        info!("artifact {}: {from} -> {next}", artifact.id);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_stage(&self,
                       artifact: &mut MeshArtifact,
                       spec: ScriptSpec,
                       kind: JobKind,
                       input: String,
                       horizon: Option<f64>,
                       output: &str,
                       on_success: MeshStatus)
                       -> Result<ProcessingJob, PipelineError> {
        let expected_output = self.settings.workspace.resolve(output);
        let job = ProcessingJob::pending(artifact.id, kind, spec.script.clone(), input.clone(), expected_output.clone());
        let request = ScriptRequest { spec, values: HandoffValues { input_file: input, horizon }, expected_output };
        match self.runner.run(&request).await {
            Ok(out) => {
                let content = String::from_utf8_lossy(&out.bytes).into_owned();
                if let Err(e) = self.transition(artifact, on_success) {
                    self.fail(artifact, kind, &e);
                    return Err(e);
                }
                self.events.append_kind(artifact.id,
                                        LifecycleEventKind::JobSucceeded { job: kind,
                                                                           output: request.expected_output.clone() });
                Ok(job.succeed(request.expected_output, content, out.stdout))
            }
            Err(e) => {
                let err = PipelineError::from(e);
                self.fail(artifact, kind, &err);
                Err(err)
            }
        }
    }

    fn abort_stage(&self,
                   guard: StageGuard<'_, M, E>,
                   artifact: &mut MeshArtifact,
                   kind: JobKind,
                   err: PipelineError)
                   -> Result<ProcessingJob, PipelineError> {
        self.fail(artifact, kind, &err);
        guard.disarm();
        Err(err)
    }

    /// Registra el fallo del job y lleva el artifact a `failed`.
    fn fail(&self, artifact: &mut MeshArtifact, kind: JobKind, err: &PipelineError) {
        let diagnostic = err.diagnostic()
                            .cloned()
                            .unwrap_or_else(|| Diagnostic { reason: err.to_string(), ..Default::default() });
        error!("artifact {}: {} falló: {}", artifact.id, kind.label(), diagnostic.reason);
        self.events.append_kind(artifact.id, LifecycleEventKind::JobFailed { job: kind, diagnostic });
        if let Err(e) = self.transition(artifact, MeshStatus::Failed) {
            warn!("artifact {}: no se pudo marcar como failed: {e}", artifact.id);
        }
    }
}

/// Nombre guardado: `<millis>-<uuid>-<sha256[..12]>-<nombre saneado>`.
/// El uuid es nuevo en cada subida, así que dos subidas idénticas nunca
/// comparten nombre.
fn stored_name_for(bytes: &[u8], filename: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(bytes));
    format!("{}-{}-{}-{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            &digest[..12],
            sanitize_filename(filename))
}

/// Sustituye por `_` todo carácter fuera de `[A-Za-z0-9._-]`. El nombre
/// guardado llega a la configuración de los scripts; el original sólo se muestra.
fn sanitize_filename(filename: &str) -> String {
    filename.chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
            .collect()
}

/// Marca el artifact como `failed` si la etapa se abandona (futuro descartado)
/// antes de llegar a un estado estable.
struct StageGuard<'a, M: FileRecordStore, E: LifecycleEventStore> {
    records: &'a M,
    events: &'a E,
    id: Uuid,
    stage: MeshStatus,
    armed: bool,
}

impl<'a, M: FileRecordStore, E: LifecycleEventStore> StageGuard<'a, M, E> {
    fn arm(records: &'a M, events: &'a E, id: Uuid, stage: MeshStatus) -> Self {
        Self { records, events, id, stage, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<M: FileRecordStore, E: LifecycleEventStore> Drop for StageGuard<'_, M, E> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("artifact {}: etapa {} abandonada, se marca failed", self.id, self.stage);
        if self.records.update_status(self.id, MeshStatus::Failed).is_ok() {
            self.events.append_kind(self.id,
                                    LifecycleEventKind::StatusChanged { from: self.stage, to: MeshStatus::Failed });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_name_is_prefixed_and_keeps_filename() {
        let name = stored_name_for(b"solid carotid", "neck.stl");
        let parts: Vec<&str> = name.splitn(4, '-').collect();
        assert_eq!(parts.len(), 4);
        assert!(parts[0].parse::<i64>().is_ok());
        assert_eq!(parts[1].len(), 32);
        assert_eq!(parts[2].len(), 12);
        assert_eq!(parts[3], "neck.stl");
    }

    #[test]
    fn stored_name_depends_on_content() {
        let a = stored_name_for(b"a", "x.stl");
        let b = stored_name_for(b"b", "x.stl");
        assert_ne!(a.split('-').nth(2), b.split('-').nth(2));
    }

    #[test]
    fn identical_uploads_never_share_a_name() {
        let names: std::collections::HashSet<String> =
            (0..200).map(|_| stored_name_for(b"solid carotid", "neck.stl")).collect();
        assert_eq!(names.len(), 200);
    }

    #[test]
    fn filename_is_sanitized_for_scripts() {
        assert_eq!(sanitize_filename("Neck-2_v1.stl"), "Neck-2_v1.stl");
        assert_eq!(sanitize_filename("x\"; import os; y=\"a.stl"), "x___import_os__y__a.stl");
        assert_eq!(sanitize_filename("a\nHORIZON=99.stl"), "a_HORIZON_99.stl");
        assert_eq!(sanitize_filename("paciente ñ.stl"), "paciente__.stl");
    }

    struct FailingRunner;

    #[async_trait::async_trait]
    impl ScriptRunner for FailingRunner {
        async fn run(&self, _request: &ScriptRequest) -> Result<carotid_engine::ScriptOutput, carotid_engine::InvokerError> {
            Err(carotid_engine::InvokerError::Execution(Diagnostic { exit_code: Some(1),
                                                                     reason: "falla".into(),
                                                                     ..Default::default() }))
        }
    }

    #[tokio::test]
    async fn per_artifact_locks_are_released() {
        use crate::{HandoffStyle, InMemoryFileRecordStore, InMemoryLifecycleEventStore, LocalDiskStorage};

        let dir = tempfile::tempdir().unwrap();
        let workspace = ScriptWorkspace::new(dir.path().join("scripts"));
        let scripts = PipelineScripts::in_workspace(&workspace, None, "convert.sh", "predict.sh", HandoffStyle::Env);
        let orch = FileLifecycleOrchestrator::new(LocalDiskStorage::new(dir.path().join("uploads")),
                                                  InMemoryFileRecordStore::new(),
                                                  InMemoryLifecycleEventStore::default(),
                                                  FailingRunner,
                                                  OrchestratorSettings { workspace,
                                                                         scripts,
                                                                         max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES });
        let art = orch.register_upload(b"solid x", "neck.stl", None).await.unwrap();
        assert!(orch.begin_conversion(art.id).await.is_err());
        assert_eq!(orch.get_status(art.id).unwrap(), MeshStatus::Failed);
        assert!(orch.begin_prediction(art.id, 1.0).await.is_err());
        assert!(orch.locks.is_empty());
    }
}
