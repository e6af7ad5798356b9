//! `carotid-flow run <malla.stl> [--patient <N>] [--horizon <H>]`
//!
//! Ejecuta el pipeline completo (subida, conversión y predicción) sobre un
//! almacén de metadatos en memoria e imprime el resumen JSON del resultado.
use carotid_core::{ErrorClass, InMemoryFileRecordStore, PipelineError};
use carotid_flow::{build_orchestrator, events_summary, init_logging, summarize, CoreError, PipelineConfig};
use log::info;

fn usage() -> ! {
    eprintln!("uso: carotid-flow run <malla.stl> [--patient <N>] [--horizon <H>]");
    std::process::exit(2);
}

fn exit_code(err: &CoreError) -> i32 {
    match err {
        CoreError::Config(_) => 3,
        CoreError::Pipeline(e) => match e.class() {
            ErrorClass::Validation => 3,
            ErrorClass::State | ErrorClass::NotFound => 4,
            _ => 5,
        },
        _ => 5,
    }
}

fn main() {
    init_logging("info");
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 || args[1] != "run" {
        usage();
    }
    let mesh = args[2].clone();
    let mut patient: Option<i64> = None;
    let mut horizon: f64 = 0.0;
    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--patient" => {
                i += 1;
                patient = args.get(i).and_then(|v| v.parse().ok());
                if patient.is_none() { usage(); }
            }
            "--horizon" => {
                i += 1;
                match args.get(i).and_then(|v| v.parse().ok()) {
                    Some(h) => horizon = h,
                    None => usage(),
                }
            }
            _ => usage(),
        }
        i += 1;
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => { eprintln!("[carotid-flow] runtime: {e}"); std::process::exit(5); }
    };
    match runtime.block_on(run(&mesh, patient, horizon)) {
        Ok(summary) => println!("{summary}"),
        Err(e) => {
            eprintln!("[carotid-flow] {e}");
            std::process::exit(exit_code(&e));
        }
    }
}

async fn run(mesh: &str, patient: Option<i64>, horizon: f64) -> Result<String, CoreError> {
    let cfg = PipelineConfig::from_env()?;
    let bytes = tokio::fs::read(mesh).await?;
    let orchestrator = build_orchestrator(&cfg, InMemoryFileRecordStore::new());

    let artifact = orchestrator.register_upload(&bytes, mesh, patient).await?;
    let outcome: Result<(), PipelineError> = async {
        orchestrator.begin_conversion(artifact.id).await?;
        orchestrator.begin_prediction(artifact.id, horizon).await?;
        Ok(())
    }.await;
    if let Err(e) = outcome {
        let events = events_summary(&orchestrator.events_for(artifact.id));
        eprintln!("[carotid-flow] eventos: {events}");
        return Err(e.into());
    }

    info!("pipeline completado para {} ({})", artifact.id, artifact.original_filename);
    let presentation = orchestrator.present(artifact.id).await?;
    let mut summary = summarize(&presentation);
    summary["events"] = events_summary(&orchestrator.events_for(artifact.id));
    serde_json::to_string_pretty(&summary).map_err(|e| CoreError::Internal(format!("serializar resumen: {e}")))
}
