//! carotid-domain: modelo de datos y pipeline numérico de nubes de puntos.
//!
//! Este crate no realiza IO ni conoce procesos externos. Contiene:
//! - `mesh_artifact`: `MeshArtifact`, su máquina de estados (`MeshStatus`) y
//!   la validación de formato de malla.
//! - `processing_job`: descripción y resultado de una invocación externa.
//! - `point_cloud`: parser tolerante del texto de nube de puntos.
//! - `spatial`: caja envolvente, normalización y encuadre de cámara.
//! - `color_ramp`: rampas de color por dominio (velocidad / presión) y leyenda.
//! - `scalar_field`: catálogo de canales escalares de un archivo predicho.
pub mod color_ramp;
pub mod error;
pub mod mesh_artifact;
pub mod point_cloud;
pub mod processing_job;
pub mod scalar_field;
pub mod spatial;

pub use color_ramp::{ColorRamp, FieldDomain, Legend, LegendStop, MagnitudeColorMapper, RampStop, Rgb, NEUTRAL_COLOR};
pub use error::DomainError;
pub use mesh_artifact::{MeshArtifact, MeshFormat, MeshStatus, NewMeshArtifact};
pub use point_cloud::{ParsedRow, Point3, PointCloudRecord, PointCloudRecordParser, SkipReason};
pub use processing_job::{Diagnostic, JobKind, JobOutcome, ProcessingJob};
pub use scalar_field::{parse_predicted, ScalarField, PREDICTED_FIELDS};
pub use spatial::{BoundingBox, CameraPlacement, NormalizedPoints, SpatialNormalizer, DEFAULT_TARGET_SPAN};
