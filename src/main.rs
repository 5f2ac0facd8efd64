use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::Path;
use trendmap::cli::{Cli, Commands};
use trendmap::config::Config;
use trendmap::pipeline::Pipeline;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            report_id,
            weekly,
        } => run_pipeline(&config, report_id.as_deref(), weekly),
        Commands::Validate { config } => validate_config(&config),
    }
}

fn run_pipeline(config_dir: &Path, report_id: Option<&str>, weekly: bool) -> Result<()> {
    let config = load_checked_config(config_dir)?;

    let pipeline = Pipeline::new(config);
    match pipeline.run(report_id, weekly) {
        Ok(outcome) => {
            println!("{} Report generated successfully", "✓".green());
            println!("  Report ID: {}", outcome.report_id);
            println!("  Report file: {}", outcome.report_path.display());
            if let Some(summary_path) = &outcome.summary_path {
                println!("  Summary backup: {}", summary_path.display());
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{} Pipeline failed: {}", "✗".red(), e);
            std::process::exit(1);
        }
    }
}

fn validate_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir)?;
    let problems = config.validate();

    if problems.is_empty() {
        println!("{} Configuration is valid", "✓".green());
        return Ok(());
    }

    report_problems(&problems);
    std::process::exit(1);
}

fn load_checked_config(config_dir: &Path) -> Result<Config> {
    let config = Config::load(config_dir)?;
    let problems = config.validate();

    if !problems.is_empty() {
        report_problems(&problems);
        std::process::exit(1);
    }

    Ok(config)
}

fn report_problems(problems: &[String]) {
    for problem in problems {
        eprintln!("Configuration error: {}", problem);
    }
}
