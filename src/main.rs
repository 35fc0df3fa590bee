//! chrond - a crontab-style job scheduler and service supervisor.
//!
//! Usage:
//!   chrond run <crontab>    Run the scheduler with the given crontab file
//!   chrond check <crontab>  Parse the crontab and report what was accepted
//!   chrond list <crontab>   List parsed jobs and their next execution times

use chrond::{Config, Daemon};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// chrond - a crontab-style job scheduler and service supervisor
#[derive(Parser)]
#[command(name = "chrond")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler with the given crontab file
    Run {
        /// Path to the crontab configuration file
        #[arg(value_name = "CRONTAB")]
        crontab: PathBuf,

        /// Override the scheduler tick interval in seconds
        #[arg(long)]
        tick_interval: Option<u64>,
    },

    /// Parse the crontab and report what was accepted
    Check {
        /// Path to the crontab configuration file
        #[arg(value_name = "CRONTAB")]
        crontab: PathBuf,
    },

    /// List parsed jobs and their next execution times
    List {
        /// Path to the crontab configuration file
        #[arg(value_name = "CRONTAB")]
        crontab: PathBuf,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            crontab,
            tick_interval,
        } => {
            let config = Config::load(&crontab)?;
            let mut daemon = Daemon::new(config);
            if let Some(seconds) = tick_interval {
                daemon = daemon.with_tick_interval(Duration::from_secs(seconds.max(1)));
            }
            info!("Starting scheduler, press Ctrl+C to stop");
            daemon.run().await;
        }
        Commands::Check { crontab } => {
            let config = Config::load(&crontab)?;
            println!(
                "{}: {} job(s) accepted (parse problems, if any, are logged above)",
                crontab.display(),
                config.jobs.len()
            );
        }
        Commands::List { crontab, json } => {
            let config = Config::load(&crontab)?;
            list_jobs(&config, json)?;
        }
    }

    Ok(())
}

/// Print each job's kind, command, and next execution time.
fn list_jobs(config: &Config, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let summaries: Vec<_> = config.jobs.iter().map(|job| job.summary()).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No jobs configured");
        return Ok(());
    }

    for summary in &summaries {
        let when = if summary.reboot {
            "at boot".to_string()
        } else if let Some(at) = summary.next_run {
            format!("next at {at}")
        } else if let Some(state) = &summary.state {
            state.clone()
        } else {
            "never".to_string()
        };
        println!("{:8} {:20} {}", summary.kind, when, summary.command);
    }

    Ok(())
}
