//! CLI del pipeline contra el backend Postgres.
//!
//! ```text
//! carotid-cli upload <malla.stl> [--patient <N>]
//! carotid-cli convert --id <UUID>
//! carotid-cli predict --id <UUID> --horizon <H>
//! carotid-cli status --id <UUID>
//! carotid-cli list --patient <N>
//! carotid-cli resubmit --id <UUID>
//! carotid-cli view <archivo_point.txt> [--field velocity|pressure]
//! ```
//! Códigos de salida: 2 uso, 3 validación, 4 estado/no encontrado, 5 error.
use carotid_core::{ErrorClass, PipelineError, PresentationContext};
use carotid_domain::FieldDomain;
use carotid_flow::{build_orchestrator, init_logging, summarize, view_summary, AppOrchestrator, PipelineConfig};
use carotid_persistence::{PgFileRecordStore, PoolProvider};
use log::info;
use uuid::Uuid;

type PgOrchestrator = AppOrchestrator<PgFileRecordStore<PoolProvider>>;

const USAGE: &str = "uso: carotid-cli <upload|convert|predict|status|list|resubmit|view> [opciones]";

#[derive(Debug, Default)]
struct Options {
    positional: Option<String>,
    id: Option<Uuid>,
    patient: Option<i64>,
    horizon: Option<f64>,
    field: Option<String>,
}

fn usage(msg: &str) -> ! {
    eprintln!("[carotid-cli] {msg}");
    eprintln!("{USAGE}");
    std::process::exit(2);
}

fn parse_options(args: &[String]) -> Options {
    let mut opts = Options::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--id" => {
                i += 1;
                opts.id = args.get(i).and_then(|v| Uuid::parse_str(v).ok());
                if opts.id.is_none() { usage("--id requiere un UUID"); }
            }
            "--patient" => {
                i += 1;
                opts.patient = args.get(i).and_then(|v| v.parse().ok());
                if opts.patient.is_none() { usage("--patient requiere un entero"); }
            }
            "--horizon" => {
                i += 1;
                opts.horizon = args.get(i).and_then(|v| v.parse().ok());
                if opts.horizon.is_none() { usage("--horizon requiere un número"); }
            }
            "--field" => {
                i += 1;
                opts.field = args.get(i).cloned();
            }
            other if !other.starts_with("--") && opts.positional.is_none() => {
                opts.positional = Some(other.to_string());
            }
            other => usage(&format!("argumento desconocido: {other}")),
        }
        i += 1;
    }
    opts
}

fn fail(err: PipelineError) -> ! {
    eprintln!("[carotid-cli] {} ({})", err, err.class().as_str());
    let code = match err.class() {
        ErrorClass::Validation => 3,
        ErrorClass::State | ErrorClass::NotFound => 4,
        _ => 5,
    };
    std::process::exit(code);
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => { eprintln!("[carotid-cli] serializar salida: {e}"); std::process::exit(5); }
    }
}

fn main() {
    let _ = dotenvy::dotenv();
    init_logging("warn");
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        usage("falta el comando");
    }
    let command = args[1].clone();
    let opts = parse_options(&args[2..]);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => { eprintln!("[carotid-cli] runtime: {e}"); std::process::exit(5); }
    };

    // `view` sólo lee un archivo local; no necesita backend
    if command == "view" {
        let Some(path) = opts.positional.as_deref() else { usage("view requiere un archivo") };
        if let Err(e) = runtime.block_on(view(path, opts.field.as_deref())) {
            fail(e);
        }
        return;
    }

    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("[carotid-cli] requiere DATABASE_URL para operar contra backend persistente");
        std::process::exit(4);
    }
    let cfg = match PipelineConfig::from_env() {
        Ok(c) => c,
        Err(e) => { eprintln!("[carotid-cli] {e}"); std::process::exit(3); }
    };
    let pool = match carotid_persistence::build_dev_pool_from_env() {
        Ok(p) => p,
        Err(e) => { eprintln!("[carotid-cli] pool error: {e}"); std::process::exit(5); }
    };
    let orchestrator = build_orchestrator(&cfg, PgFileRecordStore::new(PoolProvider { pool }));
    if let Err(e) = runtime.block_on(dispatch(&orchestrator, &command, &opts)) {
        fail(e);
    }
}

fn require_id(opts: &Options) -> Uuid {
    opts.id.unwrap_or_else(|| usage("falta --id <UUID>"))
}

async fn dispatch(orchestrator: &PgOrchestrator, command: &str, opts: &Options) -> Result<(), PipelineError> {
    match command {
        "upload" => {
            let Some(path) = opts.positional.as_deref() else { usage("upload requiere un archivo") };
            let bytes = tokio::fs::read(path).await?;
            let artifact = orchestrator.register_upload(&bytes, path, opts.patient).await?;
            info!("subida registrada: {}", artifact.id);
            print_json(&artifact);
        }
        "convert" => {
            let job = orchestrator.begin_conversion(require_id(opts)).await?;
            print_json(&job);
        }
        "predict" => {
            let horizon = opts.horizon.unwrap_or_else(|| usage("predict requiere --horizon <H>"));
            let job = orchestrator.begin_prediction(require_id(opts), horizon).await?;
            print_json(&job);
        }
        "status" => {
            let presentation = orchestrator.present(require_id(opts)).await?;
            print_json(&summarize(&presentation));
        }
        "list" => {
            let patient = opts.patient.unwrap_or_else(|| usage("list requiere --patient <N>"));
            print_json(&orchestrator.files_for_patient(patient)?);
        }
        "resubmit" => {
            let fresh = orchestrator.resubmit(require_id(opts)).await?;
            print_json(&fresh);
        }
        other => usage(&format!("comando desconocido: {other}")),
    }
    Ok(())
}

async fn view(path: &str, field: Option<&str>) -> Result<(), PipelineError> {
    let text = tokio::fs::read_to_string(path).await?;
    let ctx = PresentationContext::default();
    let view = match field {
        Some(name) => ctx.field_view(&text, name.parse::<FieldDomain>()?)?,
        None => ctx.geometry_view(&text)?,
    };
    print_json(&view_summary(&view));
    Ok(())
}
