//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) una sola vez y las valida en una
//! estructura inmutable (`PipelineConfig`).
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use carotid_core::{HandoffStyle, DEFAULT_MAX_UPLOAD_BYTES};
use carotid_engine::DEFAULT_STDERR_LIMIT;
use once_cell::sync::Lazy;

use crate::errors::core_error::CoreError;

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenvy::dotenv(); // ignora error si no existe .env
});

/// Parámetros del pipeline (almacenamiento, scripts y límites).
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Directorio donde se guardan las mallas subidas.
    pub upload_dir: PathBuf,
    pub max_upload_bytes: u64,
    /// Raíz del workspace de scripts (contiene `mesh/`, `point/`, `result/`).
    pub script_root: PathBuf,
    /// Intérprete con el que se lanzan los scripts.
    pub python: PathBuf,
    pub converter_script: String,
    pub predictor_script: String,
    pub handoff: HandoffStyle,
    pub stderr_bytes: usize,
    /// Plazo opcional por script; sin valor no hay límite.
    pub script_deadline: Option<Duration>,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, CoreError> {
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env` pero con una fuente de variables arbitraria.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
        where F: Fn(&str) -> Option<String>
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let handoff = match get("CAROTID_HANDOFF") {
            Some(v) => v.parse::<HandoffStyle>()
                        .map_err(|e| CoreError::Config(format!("CAROTID_HANDOFF: {e}")))?,
            None => HandoffStyle::default(),
        };
        let script_deadline = parse_opt::<u64>("CAROTID_SCRIPT_DEADLINE_SECS", get("CAROTID_SCRIPT_DEADLINE_SECS"))?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        Ok(Self { upload_dir: get("CAROTID_UPLOAD_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("uploads")),
                  max_upload_bytes: parse_opt("CAROTID_MAX_UPLOAD_BYTES", get("CAROTID_MAX_UPLOAD_BYTES"))?
                      .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
                  script_root: get("CAROTID_SCRIPT_ROOT").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("scripts")),
                  python: get("CAROTID_PYTHON").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("python3")),
                  converter_script: get("CAROTID_CONVERTER_SCRIPT").unwrap_or_else(|| "stl2point.py".to_string()),
                  predictor_script: get("CAROTID_PREDICTOR_SCRIPT").unwrap_or_else(|| "predict.py".to_string()),
                  handoff,
                  stderr_bytes: parse_opt("CAROTID_STDERR_BYTES", get("CAROTID_STDERR_BYTES"))?.unwrap_or(DEFAULT_STDERR_LIMIT),
                  script_deadline })
    }
}

fn parse_opt<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Result<Option<T>, CoreError> {
    raw.map(|v| v.parse::<T>().map_err(|_| CoreError::Config(format!("{key} no es un número válido: {v:?}"))))
       .transpose()
}
