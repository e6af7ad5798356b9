//! Carotid Flow
//!
//! Librería de arranque del pipeline de mallas carotídeas:
//! - `config`: `PipelineConfig` desde variables de entorno (.env).
//! - `errors`: `CoreError`, error de nivel aplicación.
//! - `bootstrap`: logging y ensamblado de `FileLifecycleOrchestrator`.
//! - `report`: resumen JSON de un artifact para la salida de los binarios.
//!
//! La lógica vive en los crates `carotid-*`; este crate sólo los conecta y
//! lo usan el binario `carotid-flow` y `carotid-cli`.

pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod report;

pub use bootstrap::{build_orchestrator, init_logging, settings_from, AppOrchestrator};
pub use config::PipelineConfig;
pub use errors::CoreError;
pub use report::{events_summary, summarize, view_summary};
