//! carotid-engine: ejecución de los programas externos del pipeline.
//!
//! Los scripts de conversión y predicción eligen su entrada leyendo una
//! configuración compartida en disco. `ExternalScriptInvoker` escribe esa
//! configuración, lanza el proceso y espera su salida dentro de una única
//! sección crítica global, de modo que dos invocaciones nunca se solapan.
pub mod error;
pub mod handoff;
pub mod invoker;

pub use error::InvokerError;
pub use handoff::{ConfigHandoff, HandoffValues, ENV_FILE_NAME};
pub use invoker::{ExternalScriptInvoker, ScriptOutput, ScriptRequest, ScriptRunner, ScriptSpec, DEFAULT_STDERR_LIMIT};
