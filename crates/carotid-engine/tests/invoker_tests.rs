use std::path::{Path, PathBuf};
use std::time::Duration;

use carotid_engine::{ConfigHandoff, ExternalScriptInvoker, HandoffValues, InvokerError, ScriptRequest, ScriptRunner, ScriptSpec};

fn sh_script(dir: &Path, name: &str, body: &str) -> ScriptSpec {
    let script = dir.join(name);
    std::fs::write(&script, body).unwrap();
    ScriptSpec { interpreter: Some(PathBuf::from("/bin/sh")),
                 script,
                 working_dir: dir.to_path_buf(),
                 handoff: ConfigHandoff::env_file(dir) }
}

fn request(spec: ScriptSpec, input: &str, output: &str) -> ScriptRequest {
    let expected_output = spec.working_dir.join(output);
    ScriptRequest { spec, values: HandoffValues { input_file: input.into(), horizon: None }, expected_output }
}

#[tokio::test]
async fn test_successful_run_returns_output_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let spec = sh_script(dir.path(),
                         "ok.sh",
                         ". ./pipeline.env\necho trabajando\necho aviso >&2\nprintf 'h\\n1 0 0 0\\n' > \"${INPUT_FILE%.stl}_point.txt\"\n");
    let out = ExternalScriptInvoker::default().run(&request(spec, "neck.stl", "neck_point.txt")).await.unwrap();
    assert_eq!(out.bytes, b"h\n1 0 0 0\n");
    assert_eq!(out.stdout.trim(), "trabajando");
    assert_eq!(out.stderr.trim(), "aviso");
}

#[tokio::test]
async fn test_non_zero_exit_is_execution_error_with_truncated_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let spec = sh_script(dir.path(), "fail.sh", "echo 'Traceback: something broke' >&2\nexit 3\n");
    let invoker = ExternalScriptInvoker::new(9, None);
    match invoker.run(&request(spec, "a.stl", "a_point.txt")).await {
        Err(InvokerError::Execution(d)) => {
            assert_eq!(d.exit_code, Some(3));
            assert_eq!(d.stderr, "Traceback");
        }
        other => panic!("se esperaba Execution, llegó {other:?}"),
    }
}

#[tokio::test]
async fn test_zero_exit_without_output_is_output_missing() {
    let dir = tempfile::tempdir().unwrap();
    let spec = sh_script(dir.path(), "noop.sh", "exit 0\n");
    let err = ExternalScriptInvoker::default().run(&request(spec, "a.stl", "a_point.txt")).await.unwrap_err();
    assert!(matches!(err, InvokerError::OutputMissing { .. }), "{err:?}");
    assert_eq!(err.diagnostic().unwrap().exit_code, Some(0));
}

#[tokio::test]
async fn test_empty_output_is_execution_error() {
    let dir = tempfile::tempdir().unwrap();
    let spec = sh_script(dir.path(), "empty.sh", ": > a_point.txt\n");
    let err = ExternalScriptInvoker::default().run(&request(spec, "a.stl", "a_point.txt")).await.unwrap_err();
    assert!(matches!(err, InvokerError::Execution(_)), "{err:?}");
}

#[tokio::test]
async fn test_deadline_expiry_is_execution_error() {
    let dir = tempfile::tempdir().unwrap();
    let spec = sh_script(dir.path(), "slow.sh", "sleep 5\n: > a_point.txt\n");
    let invoker = ExternalScriptInvoker::new(256, Some(Duration::from_millis(200)));
    match invoker.run(&request(spec, "a.stl", "a_point.txt")).await {
        Err(InvokerError::Execution(d)) => assert_eq!(d.exit_code, None),
        other => panic!("se esperaba Execution, llegó {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_interpreter_is_spawn_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut spec = sh_script(dir.path(), "x.sh", "exit 0\n");
    spec.interpreter = Some(PathBuf::from("/nonexistent/interpreter"));
    let err = ExternalScriptInvoker::default().run(&request(spec, "a.stl", "a_point.txt")).await.unwrap_err();
    assert!(matches!(err, InvokerError::Spawn { .. }), "{err:?}");
}

#[tokio::test]
async fn test_assignment_rewrite_handoff() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("settings.py");
    std::fs::write(&config, "import os\ntest_file_name = \"old\"\npredict_time = 0.1\n").unwrap();
    let mut spec = sh_script(dir.path(),
                             "predict.sh",
                             "name=$(sed -n 's/^test_file_name = \"\\(.*\\)\"$/\\1/p' settings.py)\n\
                              t=$(sed -n 's/^predict_time = //p' settings.py)\n\
                              echo \"$t\" > \"result_$name\"\n");
    spec.handoff = ConfigHandoff::AssignmentRewrite { path: config.clone(),
                                                      input_variable: "test_file_name".into(),
                                                      horizon_variable: Some("predict_time".into()) };
    let mut req = request(spec, "neck_point.txt", "result_neck_point.txt");
    req.values.horizon = Some(0.8);
    let out = ExternalScriptInvoker::default().run(&req).await.unwrap();
    assert_eq!(String::from_utf8(out.bytes).unwrap().trim(), "0.8");
}

#[tokio::test]
async fn test_concurrent_runs_never_share_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let body = ". ./pipeline.env\n\
                first=\"$INPUT_FILE\"\n\
                sleep 0.3\n\
                . ./pipeline.env\n\
                if [ \"$first\" != \"$INPUT_FILE\" ]; then echo 'configuración cambiada' >&2; exit 9; fi\n\
                echo \"procesado $first\" > \"$first.out\"\n";
    let spec = sh_script(dir.path(), "convert.sh", body);
    let invoker = ExternalScriptInvoker::default();
    let req_a = request(spec.clone(), "a", "a.out");
    let req_b = request(spec, "b", "b.out");
    let (a, b) = tokio::join!(invoker.run(&req_a), invoker.run(&req_b));
    assert_eq!(String::from_utf8(a.unwrap().bytes).unwrap().trim(), "procesado a");
    assert_eq!(String::from_utf8(b.unwrap().bytes).unwrap().trim(), "procesado b");
}
