//! carotid-core: ciclo de vida de las mallas subidas.
//!
//! Une el almacenamiento, el almacén de metadatos, el registro de eventos y el
//! invocador de scripts bajo `FileLifecycleOrchestrator`, y prepara los datos
//! de presentación a partir de las nubes de puntos producidas.
pub mod errors;
pub mod event;
pub mod orchestrator;
pub mod presentation;
pub mod repo;
pub mod storage;
pub mod workspace;

pub use errors::{ErrorClass, PipelineError};
pub use event::{InMemoryLifecycleEventStore, LifecycleEvent, LifecycleEventKind, LifecycleEventStore};
pub use orchestrator::{ArtifactPresentation, FileLifecycleOrchestrator, OrchestratorSettings, DEFAULT_MAX_UPLOAD_BYTES};
pub use presentation::{PointCloudView, PresentationContext};
pub use repo::{FileRecordStore, InMemoryFileRecordStore};
pub use storage::{LocalDiskStorage, MeshStorage};
pub use workspace::{HandoffStyle, PipelineScripts, ScriptWorkspace};
