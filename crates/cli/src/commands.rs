//! Subcommand implementations.

use ac_core::config::{load_config, AppConfig};
use ac_core::engine::GenerationEngine;
use ac_core::generation::{build_client, build_offline_client};
use ac_core::init::{generate_autocrea_structure, InitOptions};
use ac_core::service::{GenerationService, InMemoryLedger, JsonRunRepository, RunRepository};
use ac_core::state::InMemoryRunStore;
use ac_protocol::{GenerateRequest, GenerateResponse, RunEvent, RunSummary, StepStatus};
use color_eyre::eyre::{eyre, Result, WrapErr};
use colored::Colorize;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Simulated latency of each offline step.
const OFFLINE_STEP_DELAY: Duration = Duration::from_millis(150);

pub async fn init(root: &Path, force: bool) -> Result<()> {
    let written = generate_autocrea_structure(InitOptions {
        target_dir: root.to_path_buf(),
        force,
    })
    .await?;

    for path in &written {
        let shown = path.strip_prefix(root).unwrap_or(path);
        println!("{} {}", "created".green(), shown.display());
    }
    println!(
        "\nEdit {} to configure the generation backends.",
        ".autocrea/config.toml".bold()
    );
    Ok(())
}

pub struct GenerateArgs {
    pub name: String,
    pub description: String,
    pub offline: bool,
    pub json: bool,
    pub owner: String,
}

pub async fn generate(root: &Path, args: GenerateArgs) -> Result<()> {
    let config = load_config(root)
        .await
        .wrap_err_with(|| format!("failed to load configuration from {}", root.display()))?;
    let service = build_service(&config, args.offline)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let store = InMemoryRunStore::default();
    let printer = (!args.json).then(|| tokio::spawn(print_progress(store.events())));

    let request = GenerateRequest {
        project_name: args.name,
        project_description: args.description,
    };
    let result = service
        .handle_with_store(&args.owner, &request, &store, &cancel)
        .await;

    // Closing the store ends the event stream.
    drop(store);
    if let Some(printer) = printer {
        printer.await?;
    }

    let response = result.map_err(|e| eyre!("{e} (status {})", e.status_code()))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response);
    }
    Ok(())
}

pub async fn history(root: &Path, json: bool) -> Result<()> {
    let config = load_config(root).await?;
    let repository = JsonRunRepository::new(config.history_dir());
    let runs = repository.list()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }
    if runs.is_empty() {
        println!("No runs recorded in {}", repository.dir().display());
        return Ok(());
    }
    for run in &runs {
        println!("{}", format_summary(run));
    }
    Ok(())
}

fn build_service(config: &AppConfig, offline: bool) -> Result<GenerationService> {
    let client = if offline {
        build_offline_client(config, OFFLINE_STEP_DELAY)
    } else {
        build_client(config)?
    };
    debug!(offline, history_dir = %config.history_dir().display(), "service configured");

    let engine = GenerationEngine::new(Arc::new(client))
        .with_estimate_multiplier(config.service.generation.estimate_multiplier);
    let ledger = InMemoryLedger::new(config.service.generation.token_allowance);

    Ok(
        GenerationService::new(Arc::new(engine), Arc::new(ledger))
            .with_repository(Arc::new(JsonRunRepository::new(config.history_dir()))),
    )
}

async fn print_progress(mut events: Pin<Box<dyn Stream<Item = RunEvent> + Send>>) {
    while let Some(event) = events.next().await {
        if let Some(line) = format_event(&event) {
            eprintln!("{line}");
        }
    }
}

fn format_event(event: &RunEvent) -> Option<String> {
    match event {
        RunEvent::RunStarted {
            project_name,
            estimated_tokens,
            ..
        } => Some(format!(
            "{} {} (estimated {} tokens)",
            "Generating".bold(),
            project_name,
            estimated_tokens
        )),
        RunEvent::StepUpdated { role, status, .. } => {
            let label = match status {
                StepStatus::InProgress => "running".yellow(),
                StepStatus::Completed => "done".green(),
                StepStatus::Failed => "failed".red(),
                StepStatus::Pending => return None,
            };
            Some(format!("  {:<24} {}", role.title(), label))
        }
        RunEvent::RunFinished {
            total_tokens_used, ..
        } => Some(format!("{} {} tokens used", "Finished".bold(), total_tokens_used)),
        RunEvent::StepAppended { .. } | RunEvent::RunReset => None,
    }
}

fn print_response(response: &GenerateResponse) {
    println!("{}", response.generated_code);
    let failed = response
        .steps
        .iter()
        .filter(|s| s.status == StepStatus::Failed)
        .count();
    if failed > 0 {
        eprintln!(
            "{}",
            format!("{failed} of {} steps failed", response.steps.len()).red()
        );
    }
    eprintln!("run {}", response.run_id);
}

fn format_summary(run: &RunSummary) -> String {
    let saved = chrono::DateTime::from_timestamp_millis(run.saved_at)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| run.saved_at.to_string());
    let failed = if run.failed_steps > 0 {
        format!("{} failed", run.failed_steps).red().to_string()
    } else {
        "ok".green().to_string()
    };
    format!(
        "{}  {}  {:<24} {:>8} tokens  {}",
        run.run_id, saved, run.project_name, run.total_tokens_used, failed
    )
}
