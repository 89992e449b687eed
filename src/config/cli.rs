use crate::config::dates;
use crate::config::store::DEFAULT_CONFIG_FILE;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "documentor")]
#[command(about = "Download order documents from plentymarkets as zip batches")]
pub struct CliArgs {
    /// Path to the configuration record (`.toml` for TOML, JSON otherwise)
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create the configuration file from a template if it does not exist
    Init,

    /// Update configuration fields and save them
    Configure(ConfigureArgs),

    /// Print the current configuration
    Show,

    /// Log in, find documents, download them in batches and extract them
    Run(RunArgs),
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConfigureArgs {
    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long)]
    pub password: Option<String>,

    /// First day to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub start_date: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD); stored as the following midnight
    #[arg(long, value_parser = parse_date)]
    pub end_date: Option<NaiveDate>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    /// IANA timezone used for the search bounds
    #[arg(long)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, clap::Args)]
pub struct RunArgs {
    #[arg(long, default_value = "./Download")]
    pub download_dir: String,

    /// Defaults to `<download-dir>/AllFiles`
    #[arg(long)]
    pub output_dir: Option<String>,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    dates::parse_calendar(value).map_err(|e| e.to_string())
}
