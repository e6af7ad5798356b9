use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use carotid_domain::Diagnostic;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::sync::Mutex;

use crate::handoff::{ConfigHandoff, HandoffValues};
use crate::InvokerError;

/// Bytes de stderr que se conservan en el diagnóstico.
pub const DEFAULT_STDERR_LIMIT: usize = 4096;

/// Sección crítica global: escribir configuración + lanzar + esperar.
static INVOCATION_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Programa externo y cómo se le comunica la entrada.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptSpec {
    /// Intérprete (p.ej. `python3`); `None` ejecuta `script` directamente.
    pub interpreter: Option<PathBuf>,
    pub script: PathBuf,
    pub working_dir: PathBuf,
    pub handoff: ConfigHandoff,
}

impl ScriptSpec {
    /// Nombre legible del programa para logs y errores.
    pub fn program_label(&self) -> String {
        match &self.interpreter {
            Some(i) => format!("{} {}", i.display(), self.script.display()),
            None => self.script.display().to_string(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = match &self.interpreter {
            Some(interp) => {
                let mut c = Command::new(interp);
                c.arg(&self.script);
                c
            }
            None => Command::new(&self.script),
        };
        cmd.current_dir(&self.working_dir)
           .stdin(Stdio::null())
           .stdout(Stdio::piped())
           .stderr(Stdio::piped())
           .kill_on_drop(true);
        cmd
    }
}

/// Una invocación concreta.
#[derive(Debug, Clone)]
pub struct ScriptRequest {
    pub spec: ScriptSpec,
    pub values: HandoffValues,
    pub expected_output: PathBuf,
}

/// Resultado de una ejecución correcta.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptOutput {
    pub bytes: Vec<u8>,
    pub stdout: String,
    /// stderr truncado (puede no estar vacío aunque todo haya ido bien).
    pub stderr: String,
}

/// Ejecuta un script externo y devuelve el contenido de su salida.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn run(&self, request: &ScriptRequest) -> Result<ScriptOutput, InvokerError>;
}

#[derive(Debug, Clone)]
pub struct ExternalScriptInvoker {
    stderr_limit: usize,
    deadline: Option<Duration>,
}

impl Default for ExternalScriptInvoker {
    fn default() -> Self {
        Self { stderr_limit: DEFAULT_STDERR_LIMIT, deadline: None }
    }
}

impl ExternalScriptInvoker {
    pub fn new(stderr_limit: usize, deadline: Option<Duration>) -> Self {
        Self { stderr_limit, deadline }
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    fn truncate_stderr(&self, raw: &[u8]) -> String {
        let end = raw.len().min(self.stderr_limit);
        String::from_utf8_lossy(&raw[..end]).into_owned()
    }

    async fn launch_and_wait(&self, spec: &ScriptSpec) -> Result<(ExitStatus, String, String), InvokerError> {
        let child = spec.command()
                        .spawn()
                        .map_err(|source| InvokerError::Spawn { program: spec.program_label(), source })?;
        let waiting = child.wait_with_output();
        let output = match self.deadline {
            Some(limit) => match tokio::time::timeout(limit, waiting).await {
                Ok(res) => res,
                Err(_) => {
                    // el futuro descartado mata al hijo (kill_on_drop)
                    warn!("{} superó el plazo de {:?}", spec.program_label(), limit);
                    return Err(InvokerError::Execution(Diagnostic { exit_code: None,
                                                                    reason: format!("plazo de {limit:?} vencido"),
                                                                    ..Default::default() }));
                }
            },
            None => waiting.await,
        };
        let output = output.map_err(|source| InvokerError::Spawn { program: spec.program_label(), source })?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        Ok((output.status, stdout, self.truncate_stderr(&output.stderr)))
    }
}

#[async_trait]
impl ScriptRunner for ExternalScriptInvoker {
    async fn run(&self, request: &ScriptRequest) -> Result<ScriptOutput, InvokerError> {
        let spec = &request.spec;
        let (status, stdout, stderr) = {
            let _guard = INVOCATION_LOCK.lock().await;
            spec.handoff.write(&request.values).await?;
            info!("lanzando {} (input={})", spec.program_label(), request.values.input_file);
            self.launch_and_wait(spec).await?
        };
        debug!("{} terminó con {status}", spec.program_label());

        if !status.success() {
            let reason = match status.code() {
                Some(code) => format!("el proceso terminó con código {code}"),
                None => "el proceso terminó por una señal".to_string(),
            };
            return Err(InvokerError::Execution(Diagnostic { exit_code: status.code(), stdout, stderr, reason }));
        }
        let bytes = match read_if_exists(&request.expected_output).await {
            Some(bytes) => bytes,
            None => {
                let diagnostic = Diagnostic { exit_code: status.code(),
                                              stdout,
                                              stderr,
                                              reason: format!("no existe {}", request.expected_output.display()) };
                return Err(InvokerError::OutputMissing { expected: request.expected_output.clone(), diagnostic });
            }
        };
        if bytes.is_empty() {
            return Err(InvokerError::Execution(Diagnostic { exit_code: status.code(),
                                                            stdout,
                                                            stderr,
                                                            reason: format!("{} está vacío", request.expected_output.display()) }));
        }
        Ok(ScriptOutput { bytes, stdout, stderr })
    }
}

async fn read_if_exists(path: &Path) -> Option<Vec<u8>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => tokio::fs::read(path).await.ok(),
        _ => None,
    }
}
