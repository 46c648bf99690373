use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use clickup_csv::client::{ClickUpClient, RetryPolicy};
use clickup_csv::config::Config;
use clickup_csv::error::ExportError;
use clickup_csv::logging;
use clickup_csv::{export, filter};

#[derive(Parser)]
#[command(name = "clickup_csv")]
#[command(about = "ClickUp task/comment CSV exporter and keyword row filter")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export all tasks and their comments from a ClickUp list to CSV
    Export {
        /// ClickUp list id (overrides the config file)
        #[arg(long)]
        list_id: Option<String>,
        /// Output CSV path (overrides the config file)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Remove CSV rows where any cell contains any keyword
    Filter {
        /// Input CSV path
        #[arg(long)]
        input: PathBuf,
        /// Output CSV path
        #[arg(long)]
        output: PathBuf,
        /// Comma-separated keywords (overrides the config file)
        #[arg(long)]
        keywords: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging();
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    info!(config = %cli.config.display(), "configuration loaded");

    match cli.command {
        Commands::Export { list_id, output } => {
            let list_id = list_id.unwrap_or_else(|| config.clickup.list_id.clone());
            if list_id.trim().is_empty() {
                return Err(ExportError::Config(
                    "no list id: set clickup.list_id in the config file or pass --list-id".into(),
                )
                .into());
            }
            let output = output.unwrap_or_else(|| config.export.output_path.clone());
            let token = Config::api_token()?;

            let client = ClickUpClient::new(
                &config.clickup.base_url,
                token,
                RetryPolicy {
                    max_attempts: config.retry.max_attempts,
                    initial_delay: Duration::from_millis(config.retry.initial_delay_ms),
                },
            );

            println!("🔄 Running export pipeline...");
            let summary = export::run_export(
                &client,
                &list_id,
                &output,
                Duration::from_millis(config.export.task_throttle_ms),
            )
            .await?;

            println!("\n📊 Export Results:");
            println!("   Tasks: {}", summary.task_count);
            println!("   Rows written: {}", summary.row_count);
            println!("   Tasks without comments: {}", summary.tasks_without_comments);
            println!("   Finished at: {}", summary.finished_at);
            println!("\n✅ Export completed! File: {}", summary.output_file);
        }
        Commands::Filter {
            input,
            output,
            keywords,
        } => {
            let keywords: Vec<String> = match keywords {
                Some(list) => list
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                None => config.filter.keywords.clone(),
            };

            println!("🔄 Running filter pipeline...");
            let summary = filter::run_filter(&input, &output, &keywords)?;

            println!("\n📊 Filter Results:");
            println!("   Rows kept: {}", summary.kept);
            println!("   Rows removed: {}", summary.removed);
            println!("\n✅ Filter completed! File: {}", summary.output_file);
        }
    }

    Ok(())
}
