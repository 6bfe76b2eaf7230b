use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "siteform")]
#[command(about = "Formation-template export tool for site telemetry metadata", version)]
pub struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Export asset models, assets, and dashboards into a formation template.
    Export(ExportArgs),
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Management API endpoint (falls back to SITEFORM_API_URL).
    #[arg(long)]
    pub endpoint: Option<String>,
    /// Bearer token for the API (falls back to SITEFORM_API_TOKEN).
    #[arg(long)]
    pub token: Option<String>,
    /// Request timeout in milliseconds (falls back to SITEFORM_API_TIMEOUT_MS).
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    /// Asset ids to export recursively. Pass the flag with no ids to
    /// include every top-level asset; omit it to export models only.
    #[arg(short = 'a', long = "assets", num_args = 0.., value_name = "ASSET_ID")]
    pub assets: Option<Vec<String>>,
    /// Include dashboards discovered through portals and projects.
    #[arg(long, default_value_t = false)]
    pub dashboards: bool,
    /// Output directory for the template file.
    #[arg(long, default_value = "formation")]
    pub out: PathBuf,
}
