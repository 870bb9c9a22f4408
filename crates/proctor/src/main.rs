//! Proctored Exam Runner - Main Entry Point

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use proctor::{init_logging, run_attempt, RunOptions};
use proctor_session::{ProctorConfig, SessionPhase};
use tracing::info;

#[derive(Parser)]
#[command(name = "proctor", version, about = "Run a proctored exam attempt")]
struct Cli {
    /// Config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of recorded frames (defaults to capture.device)
    #[arg(long)]
    frames: Option<PathBuf>,

    /// Exam identifier
    #[arg(long, default_value = "demo-exam")]
    exam_id: String,

    /// Student username
    #[arg(long, default_value = "student")]
    student: String,

    /// Results file (JSON lines)
    #[arg(long, default_value = "./exam-results.jsonl")]
    results: PathBuf,

    /// Exam length in seconds
    #[arg(long, default_value = "60")]
    duration_secs: u64,

    /// Score submitted if the attempt is not terminated
    #[arg(long, default_value = "100")]
    score: u32,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs)?;

    info!("=== Proctor v{} ===", env!("CARGO_PKG_VERSION"));

    let config = ProctorConfig::load(cli.config.as_deref())?;
    let phase = run_attempt(RunOptions {
        config,
        frames: cli.frames,
        exam_id: cli.exam_id,
        student: cli.student,
        results: cli.results,
        duration: Duration::from_secs(cli.duration_secs),
        score: cli.score,
    })
    .await?;

    if phase == SessionPhase::Terminated {
        std::process::exit(2);
    }
    Ok(())
}
