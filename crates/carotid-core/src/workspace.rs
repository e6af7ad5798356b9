//! Directorio de trabajo de los scripts externos y convención de nombres.
//!
//! ```text
//! <root>/mesh/<stored_name>                 entrada de la conversión
//! <root>/point/<base>_point.txt             salida de la conversión / entrada de la predicción
//! <root>/result/result_<base>_point.txt     salida de la predicción
//! ```
//! Los scripts se ejecutan con `<root>` como directorio actual y reciben
//! rutas relativas a él.
use std::path::{Path, PathBuf};
use std::str::FromStr;

use carotid_engine::{ConfigHandoff, ScriptSpec};

use crate::errors::PipelineError;

pub const MESH_DIR: &str = "mesh";
pub const POINT_DIR: &str = "point";
pub const RESULT_DIR: &str = "result";

/// Variables que reescribe el estilo `assignment` en cada script.
pub const CONVERTER_INPUT_VARIABLE: &str = "convertFileName";
pub const PREDICTOR_INPUT_VARIABLE: &str = "test_file_name";
pub const PREDICTOR_HORIZON_VARIABLE: &str = "predict_time";

#[derive(Debug, Clone)]
pub struct ScriptWorkspace {
    root: PathBuf,
}

impl ScriptWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure(&self) -> Result<(), PipelineError> {
        for dir in [MESH_DIR, POINT_DIR, RESULT_DIR] {
            tokio::fs::create_dir_all(self.root.join(dir)).await?;
        }
        Ok(())
    }

    pub fn conversion_input(stored_name: &str) -> String {
        format!("{MESH_DIR}/{stored_name}")
    }

    pub fn conversion_output_name(base: &str) -> String {
        format!("{POINT_DIR}/{base}_point.txt")
    }

    pub fn prediction_output_name(base: &str) -> String {
        format!("{RESULT_DIR}/result_{base}_point.txt")
    }

    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}

/// Cómo se le indica al script qué archivo procesar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandoffStyle {
    /// `pipeline.env` con `INPUT_FILE=` / `HORIZON=`.
    #[default]
    Env,
    /// Reescritura de las asignaciones dentro del script.
    Assignment,
}

impl FromStr for HandoffStyle {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "env" => Ok(HandoffStyle::Env),
            "assignment" => Ok(HandoffStyle::Assignment),
            other => Err(PipelineError::Validation(format!("estilo de handoff desconocido: {other}"))),
        }
    }
}

/// Programas de conversión y predicción.
#[derive(Debug, Clone)]
pub struct PipelineScripts {
    pub converter: ScriptSpec,
    pub predictor: ScriptSpec,
}

impl PipelineScripts {
    /// Ambos scripts viven en la raíz del workspace.
    pub fn in_workspace(workspace: &ScriptWorkspace,
                        interpreter: Option<PathBuf>,
                        converter_script: &str,
                        predictor_script: &str,
                        style: HandoffStyle)
                        -> Self {
        let root = workspace.root();
        let spec = |script: &str, input_var: &str, horizon_var: Option<&str>| {
            let script = root.join(script);
            let handoff = match style {
                HandoffStyle::Env => ConfigHandoff::env_file(root),
                HandoffStyle::Assignment => ConfigHandoff::AssignmentRewrite { path: script.clone(),
                                                                               input_variable: input_var.to_string(),
                                                                               horizon_variable: horizon_var.map(str::to_string) },
            };
            ScriptSpec { interpreter: interpreter.clone(), script, working_dir: root.to_path_buf(), handoff }
        };
        Self { converter: spec(converter_script, CONVERTER_INPUT_VARIABLE, None),
               predictor: spec(predictor_script, PREDICTOR_INPUT_VARIABLE, Some(PREDICTOR_HORIZON_VARIABLE)) }
    }
}
