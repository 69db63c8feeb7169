//! CutPrep CLI - Bridge interface for the host
//!
//! Commands: run, verify, inspect
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 when preparation or verification fails

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use cutprep_core::{
    Document, GeometryPlayer, PageItem, PipelineParams, PreparationPipeline, Validator, Workspace,
};

#[derive(Parser)]
#[command(name = "cutprep-cli")]
#[command(about = "CutPrep CLI - bleed and cut-contour preparation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare a document
    Run {
        /// Document JSON
        #[arg(short, long)]
        document: PathBuf,

        /// Parameter bundle JSON (action paths, options)
        #[arg(short, long)]
        params: Option<PathBuf>,

        /// Where to write the prepared document (defaults to stdout report only)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a prepared document against the production invariants
    Verify {
        #[arg(short, long)]
        document: PathBuf,
    },

    /// Summarize layers and items
    Inspect {
        #[arg(short, long)]
        document: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { document, params, output } => match run(&document, params.as_deref(), output.as_deref()) {
            Ok(code) => code,
            Err(e) => fail(&e),
        },

        Commands::Verify { document } => {
            let doc = match Document::load(&document) {
                Ok(d) => d,
                Err(e) => return fail(&anyhow::Error::new(e)),
            };
            let result = Validator::new().validate(&doc);
            print_json(&result);
            if result.valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }

        Commands::Inspect { document } => {
            let doc = match Document::load(&document) {
                Ok(d) => d,
                Err(e) => return fail(&anyhow::Error::new(e)),
            };
            let layers: Vec<_> = doc
                .layers
                .iter()
                .map(|l| serde_json::json!({
                    "name": l.name,
                    "locked": l.locked,
                    "hidden": l.hidden,
                    "items": l.items.len(),
                    "leaves": l.items.iter().map(PageItem::leaf_count).sum::<usize>(),
                }))
                .collect();
            print_json(&serde_json::json!({
                "name": doc.name,
                "artboard": doc.artboard,
                "layers": layers,
            }));
            ExitCode::SUCCESS
        }
    }
}

fn run(document: &Path, params: Option<&Path>, output: Option<&Path>) -> anyhow::Result<ExitCode> {
    let doc = Document::load(document)
        .with_context(|| format!("Failed to load document {}", document.display()))?;
    let params = match params {
        Some(path) => PipelineParams::load(path)
            .with_context(|| format!("Failed to load parameters {}", path.display()))?,
        None => PipelineParams::default(),
    };

    let pipeline = PreparationPipeline::new(params);
    let mut workspace = Workspace::with_document(doc);
    let outcome = pipeline.run(&mut workspace, &mut GeometryPlayer::new());

    if let (Some(path), Some(doc)) = (output, workspace.document.as_ref()) {
        fs::write(path, doc.to_json()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    print_json(&outcome);
    Ok(if outcome.success { ExitCode::SUCCESS } else { ExitCode::from(2) })
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => println!(r#"{{"success": false, "error": "Serialization error: {}"}}"#, e),
    }
}

fn fail(e: &anyhow::Error) -> ExitCode {
    let output = serde_json::json!({
        "success": false,
        "error": format!("{:#}", e),
    });
    println!("{}", output);
    ExitCode::FAILURE
}
