//! Arranque: logging y ensamblado del orquestador a partir de `PipelineConfig`.
use carotid_core::{FileLifecycleOrchestrator, FileRecordStore, InMemoryLifecycleEventStore, LocalDiskStorage,
                   OrchestratorSettings, PipelineScripts, ScriptWorkspace};
use carotid_engine::ExternalScriptInvoker;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::PipelineConfig;

/// Orquestador con los adaptadores de producción; el almacén de metadatos es
/// el único que varía entre el binario de demo (memoria) y la CLI (Postgres).
pub type AppOrchestrator<M> =
    FileLifecycleOrchestrator<LocalDiskStorage, M, InMemoryLifecycleEventStore, ExternalScriptInvoker>;

/// Instala el subscriber de `tracing` (también recoge los registros de `log`).
/// `RUST_LOG` tiene prioridad sobre `default_filter`. Llamarla dos veces no falla.
pub fn init_logging(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let _ = tracing_subscriber::registry().with(tracing_subscriber::fmt::layer().with_target(false))
                                          .with(filter)
                                          .try_init();
}

pub fn settings_from(cfg: &PipelineConfig) -> OrchestratorSettings {
    let workspace = ScriptWorkspace::new(&cfg.script_root);
    let scripts = PipelineScripts::in_workspace(&workspace,
                                                Some(cfg.python.clone()),
                                                &cfg.converter_script,
                                                &cfg.predictor_script,
                                                cfg.handoff);
    OrchestratorSettings { workspace, scripts, max_upload_bytes: cfg.max_upload_bytes }
}

pub fn build_orchestrator<M>(cfg: &PipelineConfig, records: M) -> AppOrchestrator<M>
    where M: FileRecordStore
{
    FileLifecycleOrchestrator::new(LocalDiskStorage::new(&cfg.upload_dir),
                                   records,
                                   InMemoryLifecycleEventStore::default(),
                                   ExternalScriptInvoker::new(cfg.stderr_bytes, cfg.script_deadline),
                                   settings_from(cfg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use carotid_core::HandoffStyle;
    use carotid_engine::ConfigHandoff;
    use std::path::PathBuf;

    #[test]
    fn settings_follow_config() {
        let mut cfg = PipelineConfig::from_lookup(|_| None).unwrap();
        cfg.script_root = PathBuf::from("/opt/carotid");
        cfg.handoff = HandoffStyle::Env;
        cfg.max_upload_bytes = 99;
        let settings = settings_from(&cfg);
        assert_eq!(settings.max_upload_bytes, 99);
        assert_eq!(settings.workspace.root(), PathBuf::from("/opt/carotid").as_path());
        assert_eq!(settings.scripts.converter.script, PathBuf::from("/opt/carotid/stl2point.py"));
        assert_eq!(settings.scripts.predictor.interpreter, Some(PathBuf::from("python3")));
        assert!(matches!(settings.scripts.predictor.handoff, ConfigHandoff::EnvFile { .. }));
    }

    #[test]
    fn init_logging_is_idempotent() {
        init_logging("warn");
        init_logging("debug");
    }
}
