use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "summeval",
    version,
    about = "Local persona-aware summary quality evaluation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Score(ScoreArgs),
    Centroids(CentroidsArgs),
    Report(ReportArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    /// Directory of per-item JSON record files.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// JSONL records file (requires field mapping in the config).
    #[arg(long)]
    pub records: Option<PathBuf>,

    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, default_value = "eval_output")]
    pub out_dir: PathBuf,

    /// CSV mapping record ids to persona ids, for JSONL inputs.
    #[arg(long)]
    pub assignments: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub force_rebuild_centroids: bool,

    #[arg(long)]
    pub max_items: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct CentroidsArgs {
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, default_value = "eval_output")]
    pub out_dir: PathBuf,

    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[arg(long, default_value = "eval_output")]
    pub out_dir: PathBuf,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[arg(long, default_value_t = 5)]
    pub top_n: usize,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "eval_output")]
    pub out_dir: PathBuf,

    #[arg(long)]
    pub config: Option<PathBuf>,
}
