use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, anyhow};
use colored::*;
use netsift_common::config::Config;
use netsift_core::modal::ModalQueueManager;
use netsift_core::pipeline::{ScanPipeline, SessionReport, SessionState, StepOutcome};
use netsift_core::prompt::Prompter;
use netsift_core::system::SystemRepo;
use netsift_core::tools::ProcessRunner;
use netsift_core::ui;
use netsift_core::vendors::MacOuiRepo;
use tracing::{error, info};

use crate::mprint;
use crate::terminal::surface::TerminalSurface;
use crate::terminal::{colors, print};

pub async fn scan(cfg: Config) -> anyhow::Result<()> {
    let (dispatcher, ui_loop) = ui::channel();
    let ui_thread = ui_loop.spawn().context("failed to start the UI thread")?;

    let cfg = Arc::new(cfg);
    let prompter = Prompter::new(ModalQueueManager::new(dispatcher), Arc::new(TerminalSurface::new()));
    let pipeline = Arc::new(ScanPipeline::new(
        prompter,
        Arc::new(ProcessRunner::new(cfg.kill_grace())),
        Arc::new(SystemRepo),
        Arc::new(MacOuiRepo),
        Arc::clone(&cfg),
    ));

    let start_time = Instant::now();
    let session = pipeline.start()?;
    let report = session.await.context("scan session aborted")?;

    // The loop exits once the last dispatcher is gone.
    drop(pipeline);
    tokio::task::spawn_blocking(move || ui_thread.join())
        .await?
        .map_err(|_| anyhow!("UI thread panicked"))?;

    print_report(&report, start_time);
    Ok(())
}

fn print_report(report: &SessionReport, start_time: Instant) {
    if report.results.is_empty() {
        info!("Session ended before any step ran ({})", report.state);
        return;
    }

    print::header("session summary");
    for (idx, result) in report.results.iter().enumerate() {
        let outcome: ColoredString = match &result.outcome {
            StepOutcome::Succeeded(path) => path.display().to_string().color(colors::TEXT_DEFAULT),
            StepOutcome::Failed(reason) => reason.red(),
            StepOutcome::Cancelled => "cancelled".yellow(),
            StepOutcome::Skipped => "skipped".bright_black(),
        };
        print::tree_head(idx, result.name);
        print::as_tree_one_level(vec![("Result".to_string(), outcome)]);
    }

    if let Some(dir) = &report.session_dir {
        mprint!();
        print::print_status(format!("Session directory: {}", dir.display()));
    }

    let elapsed: ColoredString = format!("{:.2}s", start_time.elapsed().as_secs_f64()).bold().yellow();
    print::fat_separator();
    match &report.state {
        SessionState::Completed => {
            let hosts: ColoredString = format!("{} hosts", report.hosts).bold().green();
            print::centerln(&format!("Scan Complete: {hosts} categorized in {elapsed}"));
        }
        SessionState::Failed(step) => {
            error!("{step} Failed");
        }
        state => {
            print::centerln(&format!("Session {state} after {elapsed}"));
        }
    }
}
