use std::collections::HashMap;
use std::path::Path;

use carotid_core::{InMemoryFileRecordStore, PipelineError};
use carotid_domain::MeshStatus;
use carotid_flow::{build_orchestrator, events_summary, summarize, PipelineConfig};

const CONVERT: &str = ". ./pipeline.env\n\
                       base=$(basename \"$INPUT_FILE\" .stl)\n\
                       printf 'nodenumber x y z\\n1 0 0 0\\n2 2 0 0\\n' > \"point/${base}_point.txt\"\n";

const PREDICT: &str = ". ./pipeline.env\n\
                       base=$(basename \"$INPUT_FILE\" _point.txt)\n\
                       printf 'h x y z u v w vel p\\n1 0 0 0 0 0 0 0.5 10\\n2 2 0 0 0 0 0 1.5 30\\n' > \"result/result_${base}_point.txt\"\n";

fn config_for(root: &Path, max_upload: &str) -> PipelineConfig {
    let scripts = root.join("scripts");
    std::fs::create_dir_all(&scripts).unwrap();
    std::fs::write(scripts.join("stl2point.sh"), CONVERT).unwrap();
    std::fs::write(scripts.join("predict.sh"), PREDICT).unwrap();
    let vars: HashMap<&str, String> = HashMap::from([("CAROTID_UPLOAD_DIR", root.join("uploads").display().to_string()),
                                                     ("CAROTID_SCRIPT_ROOT", scripts.display().to_string()),
                                                     ("CAROTID_PYTHON", "/bin/sh".to_string()),
                                                     ("CAROTID_CONVERTER_SCRIPT", "stl2point.sh".to_string()),
                                                     ("CAROTID_PREDICTOR_SCRIPT", "predict.sh".to_string()),
                                                     ("CAROTID_MAX_UPLOAD_BYTES", max_upload.to_string()),
                                                     ("CAROTID_SCRIPT_DEADLINE_SECS", "20".to_string())]);
    PipelineConfig::from_lookup(|k| vars.get(k).cloned()).unwrap()
}

#[test]
fn pipeline_built_from_config_runs_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_for(dir.path(), "1024");
    let orch = build_orchestrator(&cfg, InMemoryFileRecordStore::new());
    tokio_test::block_on(async {
        let art = orch.register_upload(b"solid x\nendsolid x\n", "bifurcation.stl", Some(7)).await.unwrap();
        assert!(dir.path().join("uploads").join(&art.stored_name).exists());
        orch.begin_conversion(art.id).await.unwrap();
        orch.begin_prediction(art.id, 0.25).await.unwrap();
        assert_eq!(orch.get_status(art.id).unwrap(), MeshStatus::Predicted);

        let summary = summarize(&orch.present(art.id).await.unwrap());
        assert_eq!(summary["artifact"]["patient_id"], 7);
        assert_eq!(summary["point_cloud"]["points"], 2);
        assert_eq!(summary["prediction"]["velocity"]["legend"]["min_label"], "0.500");
        assert_eq!(summary["prediction"]["pressure"]["legend"]["max_label"], "30.000");
        let events = events_summary(&orch.events_for(art.id));
        assert_eq!(events.as_array().unwrap().len(), 7);
    });
}

#[test]
fn upload_limit_comes_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config_for(dir.path(), "4");
    let orch = build_orchestrator(&cfg, InMemoryFileRecordStore::new());
    let err = tokio_test::block_on(orch.register_upload(b"solid x", "neck.stl", None)).unwrap_err();
    assert!(matches!(err, PipelineError::Validation(_)));
}
