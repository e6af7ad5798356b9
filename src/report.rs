//! Resumen JSON compacto de un artifact (sin la lista de puntos).
use carotid_core::{ArtifactPresentation, LifecycleEvent, PointCloudView};
use serde_json::{json, Value};

pub fn view_summary(view: &PointCloudView) -> Value {
    let legend = view.legend
                     .as_ref()
                     .map(|l| json!({ "min_label": l.min_label, "max_label": l.max_label, "stops": l.stops }));
    json!({
        "points": view.points.points.len(),
        "skipped_lines": view.skipped_lines,
        "center": view.points.center,
        "scale": view.points.scale,
        "camera": view.camera,
        "field": view.field,
        "legend": legend,
    })
}

pub fn summarize(presentation: &ArtifactPresentation) -> Value {
    let prediction = presentation.prediction.as_ref().map(|views| {
        views.iter()
             .map(|(domain, view)| (domain.name().to_string(), view_summary(view)))
             .collect::<serde_json::Map<_, _>>()
    });
    json!({
        "artifact": presentation.artifact,
        "point_cloud": presentation.point_cloud.as_ref().map(view_summary),
        "prediction": prediction,
    })
}

pub fn events_summary(events: &[LifecycleEvent]) -> Value {
    Value::Array(events.iter().map(|e| json!({ "seq": e.seq, "ts": e.ts, "kind": e.kind })).collect())
}
