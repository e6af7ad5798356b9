//! Ensamblado de los datos que consume la superficie de render.
//!
//! Funciones puras: reciben el texto completo de la nube de puntos y devuelven
//! puntos normalizados, colores opcionales, leyenda y cámara. No hay estado
//! global de visor ni de archivo seleccionado; el contexto se pasa explícito.
use carotid_domain::{parse_predicted, CameraPlacement, FieldDomain, Legend, MagnitudeColorMapper, NormalizedPoints,
                     PointCloudRecord, PointCloudRecordParser, Rgb, ScalarField, SpatialNormalizer};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloudView {
    pub points: NormalizedPoints,
    pub camera: CameraPlacement,
    /// Un color por punto, en el mismo orden.
    pub colors: Option<Vec<Rgb>>,
    pub legend: Option<Legend>,
    pub field: Option<ScalarField>,
    pub skipped_lines: usize,
}

/// Contexto de presentación (antes global en el visor).
#[derive(Debug, Clone, Copy, Default)]
pub struct PresentationContext {
    pub normalizer: SpatialNormalizer,
    pub mapper: MagnitudeColorMapper,
}

impl PresentationContext {
    /// Geometría sin colorear (salida de la conversión).
    pub fn geometry_view(&self, text: &str) -> Result<PointCloudView, PipelineError> {
        let record = PointCloudRecordParser::parse_text(text, None);
        self.view_from_record(&record, None)
    }

    /// Nube coloreada por un campo concreto.
    pub fn field_view(&self, text: &str, domain: FieldDomain) -> Result<PointCloudView, PipelineError> {
        let record = PointCloudRecordParser::parse_text(text, Some(domain.column()));
        self.view_from_record(&record, Some(domain))
    }

    /// Una vista por cada campo predicho, en orden de catálogo.
    pub fn prediction_views(&self, text: &str) -> Result<IndexMap<FieldDomain, PointCloudView>, PipelineError> {
        parse_predicted(text).into_iter()
                             .map(|(domain, record)| Ok((domain, self.view_from_record(&record, Some(domain))?)))
                             .collect()
    }

    pub fn view_from_record(&self, record: &PointCloudRecord, domain: Option<FieldDomain>) -> Result<PointCloudView, PipelineError> {
        let points = self.normalizer.normalize(&record.points)?;
        let camera = self.normalizer.fit_camera(&record.points)?;
        let (colors, legend, field) = match (domain, record.magnitudes.as_deref()) {
            (Some(domain), Some(mags)) => {
                let (colors, legend) = self.mapper.map_to_colors(mags, domain);
                (Some(colors), legend, ScalarField::from_record(domain, record))
            }
            _ => (None, None, None),
        };
        Ok(PointCloudView { points, camera, colors, legend, field, skipped_lines: record.skipped_lines })
    }
}
