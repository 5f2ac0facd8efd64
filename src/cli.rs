use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "trendmap")]
#[command(about = "Track and analyze trending GitHub repositories", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline: fetch, classify, rank and generate a report
    Run {
        /// Path to the configuration directory
        #[arg(short, long, default_value = "config")]
        config: PathBuf,

        /// Override the generated report ID
        #[arg(long)]
        report_id: Option<String>,

        /// Force a week-based report ID regardless of configuration
        #[arg(long)]
        weekly: bool,
    },

    /// Validate configuration files without running the pipeline
    Validate {
        /// Path to the configuration directory
        #[arg(short, long, default_value = "config")]
        config: PathBuf,
    },
}
