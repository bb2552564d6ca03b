use anyhow::Context;
use clap::{Parser, Subcommand};
use hale_core::config::ConfigLoader;
use hale_core::defect_age;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hale", version, about = "Hale test harness utilities")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the run history and report how long each failing scenario
    /// has been failing
    DefectAge {
        /// History directory with per-run result records
        #[arg(long, default_value = "test-output/history")]
        history_dir: PathBuf,
        /// Write the report as CSV to this path
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Configuration inspection
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the fully resolved configuration for an environment
    Show {
        /// Environment name (resolves hale.<env>.yaml)
        #[arg(long, default_value = "local")]
        env: String,
        /// Directory holding the config files
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the report output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match args.command {
        Command::DefectAge {
            history_dir,
            output,
        } => {
            let reports = defect_age::scan_history(&history_dir).with_context(|| {
                format!("failed to scan run history in {}", history_dir.display())
            })?;
            if reports.is_empty() {
                println!("No currently failing scenarios in the history.");
            } else {
                println!(
                    "{:<50} {:>8} {:>10}  {:<20}",
                    "scenario", "streak", "age(days)", "first failure"
                );
                for report in &reports {
                    println!(
                        "{:<50} {:>8} {:>10}  {:<20}",
                        report.identity,
                        report.consecutive_failures,
                        report.age_days,
                        report.first_failure.format("%Y-%m-%d %H:%M:%S"),
                    );
                }
            }
            if let Some(path) = output {
                defect_age::write_csv(&reports, &path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                tracing::info!(path = %path.display(), "defect-age report written");
            }
        }
        Command::Config { action } => match action {
            ConfigAction::Show { env, root } => {
                let config = ConfigLoader::load(&root, &env)
                    .with_context(|| format!("failed to load configuration for env '{env}'"))?;
                print!("{}", serde_yaml::to_string(&config)?);
            }
        },
    }
    Ok(())
}
