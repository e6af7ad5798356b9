use carotid_domain::{BoundingBox, ColorRamp, FieldDomain, JobKind, MagnitudeColorMapper, Point3, PointCloudRecordParser,
                     SpatialNormalizer, DEFAULT_TARGET_SPAN, NEUTRAL_COLOR};
use proptest::prelude::*;
use serde_json::json;

const SCENARIO: &str = "nodenumber x-coordinate y-coordinate z-coordinate x-velocity y-velocity z-velocity velocity-magnitude\n\
                        1 0.0 0.0 0.0 0.0 0.0 0.0 1.0E-2\n\
                        2 1.0 0.0 0.0 0.0 0.0 0.0 5.0E-2\n\
                        3 0.0 1.0 0.0 0.0 0.0 0.0 9.0E-2\n";

#[test]
fn test_three_point_velocity_scenario() {
    let rec = PointCloudRecordParser::parse_text(SCENARIO, Some(7));
    assert_eq!(rec.len(), 3);
    let mags: Vec<f64> = rec.magnitudes.clone().unwrap().into_iter().map(|m| m.unwrap()).collect();
    assert_eq!(mags, vec![0.01, 0.05, 0.09]);

    let (colors, legend) = MagnitudeColorMapper.map_to_colors(rec.magnitudes.as_deref().unwrap(), FieldDomain::Velocity);
    let legend = legend.unwrap();
    assert_eq!(legend.min_label, "0.010");
    assert_eq!(legend.max_label, "0.090");

    // t = 0 -> azul dominante
    assert!(colors[0].b > colors[0].r && colors[0].b > colors[0].g);
    // t = 1 -> rojo
    assert!(colors[2].r > 0.99 && colors[2].g < 0.01 && colors[2].b < 0.01);
    // t = 0.5 -> banda verde-amarilla
    let ramp = ColorRamp::for_domain(FieldDomain::Velocity);
    let t = (0.05 - 0.01) / (0.09 - 0.01);
    let hue = ramp.hue_at(t);
    assert!(hue > 0.16 && hue < 0.33, "hue {hue}");
    assert_eq!(colors[1], ramp.color_at(t));
}

#[test]
fn test_scenario_normalizes_into_view_volume() {
    let rec = PointCloudRecordParser::parse_text(SCENARIO, None);
    let norm = SpatialNormalizer::default().normalize(&rec.points).unwrap();
    assert_eq!(norm.points.len(), 3);
    let bb = BoundingBox::from_points(&norm.points).unwrap();
    assert!((bb.extent() - DEFAULT_TARGET_SPAN).abs() < 1e-9);
    let cam = SpatialNormalizer::default().fit_camera(&rec.points).unwrap();
    assert_eq!(cam.position, Point3::new(0.5, 0.5, 2.0));
}

#[test]
fn test_job_kind_serialization_is_tagged() {
    let v = serde_json::to_value(JobKind::Prediction { horizon: 0.25 }).unwrap();
    assert_eq!(v, json!({"kind": "prediction", "horizon": 0.25}));
    assert_eq!(serde_json::to_value(JobKind::Conversion).unwrap(), json!({"kind": "conversion"}));
}

#[test]
fn test_missing_magnitudes_keep_points() {
    let text = "h\n1 0 0 0 0 0 0 0.5\n2 1 1 1\n3 2 2 2 0 0 0 1.5\n";
    let rec = PointCloudRecordParser::parse_text(text, Some(7));
    assert_eq!(rec.len(), 3);
    let (colors, _) = MagnitudeColorMapper.map_to_colors(rec.magnitudes.as_deref().unwrap(), FieldDomain::Pressure);
    assert_eq!(colors.len(), rec.len());
    assert_eq!(colors[1], NEUTRAL_COLOR);
}

fn coord() -> impl Strategy<Value = f64> {
    -1.0e4f64..1.0e4
}

fn point() -> impl Strategy<Value = Point3> {
    (coord(), coord(), coord()).prop_map(|(x, y, z)| Point3::new(x, y, z))
}

proptest! {
    #[test]
    fn prop_normalized_cloud_fits_target_span(points in prop::collection::vec(point(), 1..64)) {
        let norm = SpatialNormalizer::default().normalize(&points).unwrap();
        let bb = BoundingBox::from_points(&norm.points).unwrap();
        let extent = BoundingBox::from_points(&points).unwrap().extent();
        if extent > 0.0 {
            prop_assert!((bb.extent() - DEFAULT_TARGET_SPAN).abs() < 1e-6);
        } else {
            prop_assert_eq!(bb.extent(), 0.0);
        }
        let c = bb.center();
        prop_assert!(c.x.abs() < 1e-6 && c.y.abs() < 1e-6 && c.z.abs() < 1e-6);
    }

    #[test]
    fn prop_parse_preserves_order_and_length(points in prop::collection::vec(point(), 0..64)) {
        let mut text = String::from("nodenumber x y z\n");
        for (i, p) in points.iter().enumerate() {
            text.push_str(&format!("{} {:e} {:e} {:e}\n", i + 1, p.x, p.y, p.z));
        }
        let rec = PointCloudRecordParser::parse_text(&text, None);
        prop_assert_eq!(rec.points, points);
    }

    #[test]
    fn prop_colors_match_input_length(mags in prop::collection::vec(prop::option::of(-1.0e3f64..1.0e3), 0..64)) {
        for domain in [FieldDomain::Velocity, FieldDomain::Pressure] {
            let (colors, legend) = MagnitudeColorMapper.map_to_colors(&mags, domain);
            prop_assert_eq!(colors.len(), mags.len());
            prop_assert_eq!(legend.is_some(), mags.iter().any(|m| m.is_some()));
            for c in &colors {
                prop_assert!((0.0..=1.0).contains(&c.r) && (0.0..=1.0).contains(&c.g) && (0.0..=1.0).contains(&c.b));
            }
        }
    }

    #[test]
    fn prop_hue_is_monotonic_in_t(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        for domain in [FieldDomain::Velocity, FieldDomain::Pressure] {
            let ramp = ColorRamp::for_domain(domain);
            prop_assert!(ramp.hue_at(lo) >= ramp.hue_at(hi) - 1e-12);
        }
    }
}
