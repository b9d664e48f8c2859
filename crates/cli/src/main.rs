//! Vivid CLI - command-line client for the Vivid admission queue

mod generate;
mod rpc;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::json;
use tabled::Table;
use tracing_subscriber::EnvFilter;

use crate::generate::GenerateArgs;
use crate::rpc::{
    call_rpc, CheckResult, CompleteResult, LeaveResult, StartResult, StatsResult, StatusResult,
};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9627";

#[derive(Parser)]
#[command(name = "vivid")]
#[command(about = "Vivid admission queue CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "VIVID_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Join the queue (claims the slot right away when it is free)
    Check {
        #[arg(short, long)]
        owner: String,

        #[arg(short, long, default_value = "")]
        title: String,

        #[arg(short, long, default_value = "")]
        content: String,
    },

    /// Show position and estimated wait for a queue item
    Status {
        queue_item_id: String,
    },

    /// Claim the processing slot
    Start {
        #[arg(short, long)]
        owner: String,
    },

    /// Release the processing slot
    Complete {
        #[arg(short, long)]
        owner: String,
    },

    /// Leave the queue
    Leave {
        #[arg(short, long)]
        owner: String,

        queue_item_id: String,
    },

    /// Show daemon counters
    Stats,

    /// Wait for the slot, run a generator command, release the slot
    Generate {
        #[arg(short, long)]
        owner: String,

        #[arg(short, long, default_value = "")]
        title: String,

        /// Article body; `@path` reads it from a file
        #[arg(short, long, default_value = "")]
        content: String,

        /// Generator executable (reads request JSON on stdin, writes the article to stdout)
        #[arg(long)]
        command: String,

        /// Extra generator arguments
        #[arg(long = "arg", allow_hyphen_values = true)]
        args: Vec<String>,

        #[arg(long)]
        working_dir: Option<PathBuf>,

        /// Generator time limit
        #[arg(long, default_value = "300000")]
        timeout_ms: i64,

        /// Write the article here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Diagnostics only; command output goes through println!
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check {
            owner,
            title,
            content,
        } => {
            let params = json!({
                "ownerId": owner,
                "title": title,
                "content": content,
            });
            let result: CheckResult = call_rpc(&cli.rpc_url, "queue.check.v1", params).await?;

            if result.can_process {
                println!("{}", "✓ Slot granted, start generating".green().bold());
            } else {
                println!("{}", "Queued".cyan().bold());
            }
            println!();
            println!("{}", Table::new(vec![result]));
        }

        Commands::Status { queue_item_id } => {
            let params = json!({ "queueItemId": queue_item_id });
            let result: StatusResult = call_rpc(&cli.rpc_url, "queue.status.v1", params).await?;

            if !result.in_queue {
                println!(
                    "{}",
                    format!("Queue item {} is not in the queue", queue_item_id).yellow()
                );
            }
            println!("{}", Table::new(vec![result]));
        }

        Commands::Start { owner } => {
            let params = json!({ "ownerId": owner });
            let result: StartResult = call_rpc(&cli.rpc_url, "queue.start.v1", params).await?;

            if result.success {
                println!(
                    "{} {}",
                    "✓ Processing slot claimed for".green().bold(),
                    result.queue_item_id.unwrap_or_default()
                );
            } else {
                println!(
                    "{} {}",
                    "✗ Start rejected:".red().bold(),
                    result.error.unwrap_or_default()
                );
                if let Some(ms) = result.retry_after.filter(|ms| *ms > 0) {
                    println!("  retry in {:.1}s", ms as f64 / 1000.0);
                }
            }
        }

        Commands::Complete { owner } => {
            let params = json!({ "ownerId": owner });
            let result: CompleteResult =
                call_rpc(&cli.rpc_url, "queue.complete.v1", params).await?;

            if result.released {
                println!("{}", "✓ Processing slot released".green().bold());
            } else {
                println!("{}", "○ No slot held (already released)".yellow());
            }
        }

        Commands::Leave {
            owner,
            queue_item_id,
        } => {
            let params = json!({
                "ownerId": owner,
                "queueItemId": queue_item_id,
            });
            let result: LeaveResult = call_rpc(&cli.rpc_url, "queue.leave.v1", params).await?;

            if result.removed {
                println!("{}", format!("✓ Left queue ({})", queue_item_id).green().bold());
            } else {
                println!("{}", format!("○ {} was not in the queue", queue_item_id).yellow());
            }
        }

        Commands::Stats => {
            println!("{}", "Queue Status".cyan().bold());
            println!();

            match call_rpc::<StatsResult>(&cli.rpc_url, "admin.stats.v1", json!({})).await {
                Ok(stats) => print_stats(&cli.rpc_url, &stats),
                Err(e) => {
                    println!("  {} {}", "Status:".bold(), "ERROR".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }

        Commands::Generate {
            owner,
            title,
            content,
            command,
            args,
            working_dir,
            timeout_ms,
            output,
        } => {
            let content = match content.strip_prefix('@') {
                Some(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                    anyhow::anyhow!("Failed to read content from {}: {}", path, e)
                })?,
                None => content,
            };
            generate::run(
                &cli.rpc_url,
                GenerateArgs {
                    owner_id: owner,
                    title,
                    content,
                    command,
                    args,
                    working_dir,
                    timeout_ms,
                    output,
                },
            )
            .await?;
        }
    }

    Ok(())
}

fn print_stats(rpc_url: &str, stats: &StatsResult) {
    println!("  {} {}", "RPC URL:".bold(), rpc_url);
    println!("  {} {}", "Status:".bold(), "ONLINE".green());
    println!();
    println!("  {} {}", "Waiting:".bold(), stats.waiting);
    match (&stats.processing, stats.processing_since) {
        (Some(id), Some(since)) => println!("  {} {} (since {})", "Processing:".bold(), id, since),
        (Some(id), None) => println!("  {} {}", "Processing:".bold(), id),
        _ => println!("  {} {}", "Processing:".bold(), "idle".dimmed()),
    }
    if let Some(oldest) = stats.oldest_waiting_since {
        println!("  {} {}", "Oldest waiting since:".bold(), oldest);
    }
    println!();
    println!(
        "  {} {}s",
        "Rate interval:".bold(),
        stats.interval_ms / 1000
    );
    match stats.last_completed_at {
        Some(at) => println!("  {} {}", "Last completed at:".bold(), at),
        None => println!("  {} {}", "Last completed at:".bold(), "never".dimmed()),
    }
    println!(
        "  {} {:.1}s",
        "Window remaining:".bold(),
        stats.rate_window_remaining_ms as f64 / 1000.0
    );
    println!();
    println!("  {} {}", "RPC tokens:".bold(), stats.rate_limit_tokens);
    println!("  {} {} seconds", "Uptime:".bold(), stats.uptime_seconds);
}
