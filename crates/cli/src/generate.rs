// `vivid generate`: wait for the slot, run the generator, release

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use tokio::sync::mpsc;

use vivid_core::application::{
    shutdown_channel, ClientCoordinator, CoordinatorConfig, CoordinatorEvent,
};
use vivid_core::domain::WaitEstimate;
use vivid_core::port::time_provider::SystemTimeProvider;
use vivid_core::port::GenerationRequest;
use vivid_infra_system::{SubprocessPipeline, SubprocessPipelineConfig};
use vivid_queue_sdk::VividQueueClient;

pub struct GenerateArgs {
    pub owner_id: String,
    pub title: String,
    pub content: String,
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout_ms: i64,
    pub output: Option<PathBuf>,
}

pub async fn run(rpc_url: &str, args: GenerateArgs) -> Result<()> {
    let client = VividQueueClient::connect(rpc_url)
        .await
        .context("Failed to connect to daemon")?;

    let mut pipeline_config = SubprocessPipelineConfig::new(args.command)
        .with_args(args.args)
        .with_timeout_ms(args.timeout_ms);
    if let Some(dir) = args.working_dir {
        pipeline_config = pipeline_config.with_working_dir(dir);
    }
    let pipeline = SubprocessPipeline::new(pipeline_config, Arc::new(SystemTimeProvider));

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let coordinator = ClientCoordinator::new(
        Arc::new(client),
        Arc::new(pipeline),
        CoordinatorConfig::default(),
    )
    .with_events(events_tx);

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Interrupted, leaving the queue...".yellow());
            shutdown_tx.shutdown();
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            print_event(&event);
        }
    });

    let request = GenerationRequest::new(args.owner_id, args.title, args.content);
    let result = coordinator.run(request, shutdown_rx).await;
    // Closes the event channel so the printer drains and exits
    drop(coordinator);
    let _ = printer.await;

    let artifact = result.context("Generation failed")?;
    match args.output {
        Some(path) => {
            tokio::fs::write(&path, &artifact.body)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{} {} ({:.1}s)",
                "✓ Article written to".green().bold(),
                path.display(),
                artifact.duration_ms as f64 / 1000.0
            );
        }
        None => println!("{}", artifact.body),
    }
    Ok(())
}

fn print_event(event: &CoordinatorEvent) {
    match event {
        CoordinatorEvent::Joined {
            queue_item_id,
            can_process,
        } => {
            let note = if *can_process {
                "slot granted".green()
            } else {
                "waiting".yellow()
            };
            eprintln!("{} {} ({})", "Joined queue as".bold(), queue_item_id, note);
        }
        CoordinatorEvent::Queued {
            position,
            total_in_queue,
            estimated_wait,
        } => {
            let wait = match estimated_wait {
                WaitEstimate::Known(ms) => format!("~{}s", (ms + 999) / 1000),
                WaitEstimate::Unknown => "unknown".to_string(),
            };
            eprintln!(
                "  position {} of {}, estimated wait {}",
                position, total_in_queue, wait
            );
        }
        CoordinatorEvent::MembershipLost { rejoins } => {
            eprintln!("{} (re-join #{})", "Queue membership lost".yellow(), rejoins);
        }
        CoordinatorEvent::Started { .. } => {
            eprintln!("{}", "Generating...".cyan().bold());
        }
        CoordinatorEvent::PipelineFinished { success } => {
            if *success {
                eprintln!("  {} generator finished", "✓".green());
            } else {
                eprintln!("  {} generator failed", "✗".red());
            }
        }
        CoordinatorEvent::Completed { released } => {
            if !*released {
                eprintln!("  {}", "slot was already released by the daemon".yellow());
            }
        }
    }
}
