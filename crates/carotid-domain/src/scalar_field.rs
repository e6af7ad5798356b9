//! Canales escalares de un archivo predicho.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::color_ramp::FieldDomain;
use crate::point_cloud::{PointCloudRecord, PointCloudRecordParser};

/// Campos que el predictor escribe, en orden de columna.
pub const PREDICTED_FIELDS: [FieldDomain; 2] = [FieldDomain::Velocity, FieldDomain::Pressure];

/// Canal de magnitud extraído de una columna concreta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarField {
    pub name: String,
    pub domain: FieldDomain,
    pub column: usize,
    pub min: f64,
    pub max: f64,
}

impl ScalarField {
    /// Rango observado del registro. `None` si no trae ninguna magnitud finita.
    pub fn from_record(domain: FieldDomain, record: &PointCloudRecord) -> Option<Self> {
        let values = record.magnitudes.as_ref()?;
        let (min, max) = values.iter()
                               .filter_map(|m| m.filter(|v| v.is_finite()))
                               .fold(None, |acc: Option<(f64, f64)>, v| {
                                   Some(acc.map_or((v, v), |(lo, hi)| (lo.min(v), hi.max(v))))
                               })?;
        Some(Self { name: domain.name().to_string(), domain, column: domain.column(), min, max })
    }
}

/// Parsea `text` una vez por campo predicho y devuelve los registros en el
/// orden de `PREDICTED_FIELDS`.
pub fn parse_predicted(text: &str) -> IndexMap<FieldDomain, PointCloudRecord> {
    PREDICTED_FIELDS.iter()
                    .map(|d| (*d, PointCloudRecordParser::parse_text(text, Some(d.column()))))
                    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREDICTED: &str = "nodenumber x y z u v w velocity-magnitude pressure\n\
                             1 0 0 0 0 0 0 0.25 101.5\n\
                             2 1 0 0 0 0 0 0.75 99.0\n";

    #[test]
    fn catalog_order_is_stable() {
        let parsed = parse_predicted(PREDICTED);
        let keys: Vec<FieldDomain> = parsed.keys().copied().collect();
        assert_eq!(keys, PREDICTED_FIELDS.to_vec());
    }

    #[test]
    fn field_ranges() {
        let parsed = parse_predicted(PREDICTED);
        let vel = ScalarField::from_record(FieldDomain::Velocity, &parsed[&FieldDomain::Velocity]).unwrap();
        assert_eq!((vel.column, vel.min, vel.max), (7, 0.25, 0.75));
        let pre = ScalarField::from_record(FieldDomain::Pressure, &parsed[&FieldDomain::Pressure]).unwrap();
        assert_eq!((pre.name.as_str(), pre.min, pre.max), ("pressure", 99.0, 101.5));
    }

    #[test]
    fn record_without_channel_has_no_field() {
        let rec = PointCloudRecordParser::parse_text("h\n1 0 0 0\n", None);
        assert!(ScalarField::from_record(FieldDomain::Velocity, &rec).is_none());
        let rec = PointCloudRecordParser::parse_text("h\n1 0 0 0\n", Some(7));
        assert!(ScalarField::from_record(FieldDomain::Velocity, &rec).is_none());
    }
}
