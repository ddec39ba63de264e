use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Terminal client for the project management server.
/// Flat pages are plain subcommands; the wizards run as full-screen TUI.
#[derive(Parser)]
#[command(name = "pmt", version, about = "Project management terminal client")]
pub struct Cli {
    /// Base URL of the API server. Overrides PMTERM_API_URL and config.json.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Directory holding config.json and the session cache.
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
