//! Normalización espacial y encuadre de cámara.
//!
//! La normalización lleva la nube a un volumen de visualización fijo
//! (`target_span` unidades en el eje más largo, centrada en el origen) sin
//! importar las unidades nativas del artifact. El encuadre de cámara se
//! calcula siempre sobre la caja sin normalizar.
use serde::{Deserialize, Serialize};

use crate::point_cloud::Point3;
use crate::DomainError;

/// Tamaño canónico del eje más largo tras normalizar.
pub const DEFAULT_TARGET_SPAN: f64 = 10.0;

/// Caja envolvente alineada a ejes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3,
    pub max: Point3,
}

impl BoundingBox {
    /// Calcula la caja en una sola pasada. Falla con `EmptyInput` si no hay puntos.
    pub fn from_points(points: &[Point3]) -> Result<Self, DomainError> {
        let first = points.first()
                          .ok_or_else(|| DomainError::EmptyInput("la caja envolvente requiere al menos un punto".into()))?;
        let mut bb = BoundingBox { min: *first, max: *first };
        for p in &points[1..] {
            bb.min.x = bb.min.x.min(p.x);
            bb.min.y = bb.min.y.min(p.y);
            bb.min.z = bb.min.z.min(p.z);
            bb.max.x = bb.max.x.max(p.x);
            bb.max.y = bb.max.y.max(p.y);
            bb.max.z = bb.max.z.max(p.z);
        }
        Ok(bb)
    }

    pub fn center(&self) -> Point3 {
        Point3::new((self.min.x + self.max.x) * 0.5,
                    (self.min.y + self.max.y) * 0.5,
                    (self.min.z + self.max.z) * 0.5)
    }

    pub fn spans(&self) -> [f64; 3] {
        [self.max.x - self.min.x, self.max.y - self.min.y, self.max.z - self.min.z]
    }

    /// Mayor de las tres extensiones por eje.
    pub fn extent(&self) -> f64 {
        let [sx, sy, sz] = self.spans();
        sx.max(sy).max(sz)
    }
}

/// Puntos listos para el render, con la transformación aplicada.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoints {
    pub points: Vec<Point3>,
    /// Centro original restado a cada punto.
    pub center: Point3,
    /// Factor uniforme aplicado tras centrar (1.0 si la nube es degenerada).
    pub scale: f64,
}

/// Posición de cámara: `position` mirando hacia `target`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPlacement {
    pub position: Point3,
    pub target: Point3,
}

#[derive(Debug, Clone, Copy)]
pub struct SpatialNormalizer {
    target_span: f64,
}

impl Default for SpatialNormalizer {
    fn default() -> Self {
        Self { target_span: DEFAULT_TARGET_SPAN }
    }
}

impl SpatialNormalizer {
    pub fn with_target_span(target_span: f64) -> Result<Self, DomainError> {
        if !target_span.is_finite() || target_span <= 0.0 {
            return Err(DomainError::Validation(format!("target_span debe ser positivo y finito: {target_span}")));
        }
        Ok(Self { target_span })
    }

    pub fn target_span(&self) -> f64 {
        self.target_span
    }

    /// Centra en el origen y escala uniformemente a `target_span`.
    /// Con extensión cero sólo se centra.
    pub fn normalize(&self, points: &[Point3]) -> Result<NormalizedPoints, DomainError> {
        let bb = BoundingBox::from_points(points)?;
        let center = bb.center();
        let extent = bb.extent();
        let scale = if extent > 0.0 { self.target_span / extent } else { 1.0 };
        let points = points.iter()
                           .map(|p| Point3::new((p.x - center.x) * scale, (p.y - center.y) * scale, (p.z - center.z) * scale))
                           .collect();
        Ok(NormalizedPoints { points, center, scale })
    }

    /// Cámara en `center + (0, 0, 2 * extent)` mirando al centro.
    pub fn fit_camera(&self, points: &[Point3]) -> Result<CameraPlacement, DomainError> {
        let bb = BoundingBox::from_points(points)?;
        let center = bb.center();
        let position = Point3::new(center.x, center.y, center.z + 2.0 * bb.extent());
        Ok(CameraPlacement { position, target: center })
    }
}
