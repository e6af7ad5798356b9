//! Escritura de la configuración que el script externo lee al arrancar.
//!
//! Dos estilos:
//! - `EnvFile`: archivo `clave=valor` en el directorio de trabajo.
//! - `AssignmentRewrite`: se reescriben las líneas de asignación
//!   (`nombre = "..."`) dentro del propio código fuente del script.
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::InvokerError;

/// Nombre por defecto del archivo de configuración estilo env.
pub const ENV_FILE_NAME: &str = "pipeline.env";

/// Valores que se comunican al script en cada invocación.
#[derive(Debug, Clone, PartialEq)]
pub struct HandoffValues {
    /// Nombre (relativo al directorio del script) del archivo a procesar.
    pub input_file: String,
    pub horizon: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "style")]
pub enum ConfigHandoff {
    EnvFile { path: PathBuf },
    AssignmentRewrite {
        path: PathBuf,
        input_variable: String,
        horizon_variable: Option<String>,
    },
}

impl ConfigHandoff {
    pub fn env_file(working_dir: &Path) -> Self {
        ConfigHandoff::EnvFile { path: working_dir.join(ENV_FILE_NAME) }
    }

    pub fn path(&self) -> &Path {
        match self {
            ConfigHandoff::EnvFile { path } | ConfigHandoff::AssignmentRewrite { path, .. } => path,
        }
    }

    /// Escribe la configuración. Debe llamarse dentro de la sección crítica
    /// del invocador.
    pub async fn write(&self, values: &HandoffValues) -> Result<(), InvokerError> {
        let path = self.path();
        let body = match self {
            ConfigHandoff::EnvFile { .. } => render_env(values).map_err(|r| handoff_err(path, r))?,
            ConfigHandoff::AssignmentRewrite { input_variable, horizon_variable, .. } => {
                let source = tokio::fs::read_to_string(path).await
                                                            .map_err(|e| handoff_err(path, e.to_string()))?;
                rewrite_assignments(&source, input_variable, horizon_variable.as_deref(), values).map_err(|r| handoff_err(path, r))?
            }
        };
        tokio::fs::write(path, body).await.map_err(|e| handoff_err(path, e.to_string()))?;
        debug!("configuración escrita en {} (input={})", path.display(), values.input_file);
        Ok(())
    }
}

fn handoff_err(path: &Path, reason: String) -> InvokerError {
    InvokerError::Handoff { path: path.to_path_buf(), reason }
}

fn render_env(values: &HandoffValues) -> Result<String, String> {
    check_input_value(&values.input_file)?;
    let mut out = format!("INPUT_FILE={}\n", values.input_file);
    if let Some(h) = values.horizon {
        out.push_str(&format!("HORIZON={h}\n"));
    }
    Ok(out)
}

/// El valor se escribe literal dentro de comillas dobles o de una línea
/// `clave=valor`; no puede cerrar la cadena ni abrir otra línea.
fn check_input_value(value: &str) -> Result<(), String> {
    match value.chars().find(|c| matches!(c, '"' | '\\' | '\n' | '\r')) {
        Some(c) => Err(format!("carácter no permitido {c:?} en el archivo de entrada {value:?}")),
        None => Ok(()),
    }
}

/// Reemplaza `var = ...` conservando la indentación. Falla si la variable de
/// entrada (o la de horizonte, cuando hay horizonte) no aparece.
pub fn rewrite_assignments(source: &str,
                           input_variable: &str,
                           horizon_variable: Option<&str>,
                           values: &HandoffValues)
                           -> Result<String, String> {
    check_input_value(&values.input_file)?;
    let mut found_input = false;
    let mut found_horizon = false;
    let mut lines = Vec::new();
    for line in source.lines() {
        if assigns(line, input_variable) {
            found_input = true;
            lines.push(format!("{}{} = \"{}\"", indentation(line), input_variable, values.input_file));
            continue;
        }
        if let (Some(var), Some(h)) = (horizon_variable, values.horizon) {
            if assigns(line, var) {
                found_horizon = true;
                lines.push(format!("{}{} = {}", indentation(line), var, h));
                continue;
            }
        }
        lines.push(line.to_string());
    }
    if !found_input {
        return Err(format!("no se encontró la asignación de `{input_variable}`"));
    }
    if let (Some(var), Some(_)) = (horizon_variable, values.horizon) {
        if !found_horizon {
            return Err(format!("no se encontró la asignación de `{var}`"));
        }
    }
    let mut out = lines.join("\n");
    if source.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

fn indentation(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// `true` si la línea es `var = ...` (no `var == ...` ni `other_var = ...`).
fn assigns(line: &str, var: &str) -> bool {
    let Some(rest) = line.trim_start().strip_prefix(var) else {
        return false;
    };
    let rest = rest.trim_start();
    rest.starts_with('=') && !rest.starts_with("==")
}
