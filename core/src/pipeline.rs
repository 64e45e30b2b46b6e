//! # Scan Pipeline
//!
//! One session is a straight line of suspension points:
//!
//! ```text
//! CollectingRange -> CollectingInterface -> CollectingDirectory
//!     -> Running(0..7) -> Completed | Cancelled | Failed(step)
//! ```
//!
//! Parameters are collected through the modal queue; cancelling any prompt
//! ends the session before anything touches the disk. The steps then run in
//! the fixed [`PipelineStep::template`] order on a background task, streaming
//! tool output into the output view.
//!
//! Only one session runs at a time.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use netsift_common::config::Config;
use netsift_common::error::ScanError;
use netsift_common::network::interface::{self, InterfaceSelection};
use netsift_common::network::range::ScanRange;
use netsift_common::system::SystemRepository;
use netsift_common::vendors::VendorRepository;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::prompt::{OutputSink, Prompter};
use crate::registry::HostRegistry;
use crate::surface::{ConfirmPrompt, InputPrompt, Notice, ResultSummary, StyledLine};
use crate::tools::ToolRunner;

mod session;
mod steps;

pub use session::{ScanSession, SessionLayout, SessionParams, SessionState, hostfiles_dir};
pub use steps::{
    Criticality, PipelineStep, StepKind, StepOutcome, StepResult, recategorize, write_categories,
};

use steps::StepContext;

const TITLE: &str = "Discovery Scan";
const OUTPUT_TITLE: &str = "Discovery Scan Output";

/// How a session ended.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub state: SessionState,
    pub session_dir: Option<PathBuf>,
    pub results: Vec<StepResult>,
    pub hosts: usize,
}

impl SessionReport {
    fn before_start(state: SessionState) -> Self {
        Self {
            state,
            session_dir: None,
            results: Vec::new(),
            hosts: 0,
        }
    }
}

pub struct ScanPipeline {
    prompter: Prompter,
    runner: Arc<dyn ToolRunner>,
    system: Arc<dyn SystemRepository>,
    vendors: Arc<dyn VendorRepository>,
    config: Arc<Config>,
    busy: Arc<AtomicBool>,
}

/// Clears the busy flag when the session task ends, however it ends.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ScanPipeline {
    pub fn new(
        prompter: Prompter,
        runner: Arc<dyn ToolRunner>,
        system: Arc<dyn SystemRepository>,
        vendors: Arc<dyn VendorRepository>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            prompter,
            runner,
            system,
            vendors,
            config,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Starts a session on a background task.
    ///
    /// Rejected with [`ScanError::SessionActive`] while another session runs.
    pub fn start(self: &Arc<Self>) -> Result<JoinHandle<SessionReport>, ScanError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Rejected a scan request, a session is already running");
            self.prompter
                .post_notice(Notice::error("Scan Busy", ScanError::SessionActive.to_string()));
            return Err(ScanError::SessionActive);
        }

        let guard = BusyGuard(Arc::clone(&self.busy));
        let pipeline = Arc::clone(self);
        Ok(tokio::spawn(async move {
            let _guard = guard;
            pipeline.run_session().await
        }))
    }

    async fn run_session(&self) -> SessionReport {
        let mut state = SessionState::CollectingRange;
        let Some(params) = self.collect_params(&mut state).await else {
            info!("Scan cancelled while collecting parameters");
            return SessionReport::before_start(SessionState::Cancelled);
        };

        let cancel = CancellationToken::new();
        let layout = SessionLayout::resolve(&self.config.working_directory, &params.dir_name);
        info!(
            "Scanning {} via {} into {}",
            params.range,
            params.interface,
            layout.root().display()
        );

        let Some(view) = self.prompter.open_output(OUTPUT_TITLE, cancel.clone()).await else {
            warn!("Output view could not be opened");
            return SessionReport::before_start(SessionState::Cancelled);
        };

        let mut session = ScanSession::new(params, layout, cancel);
        let state = self.execute(&mut session, &view).await;
        view.close(banner(&state));

        match &state {
            SessionState::Completed if !session.registry.is_empty() => {
                let show = self
                    .prompter
                    .confirm(ConfirmPrompt::new("Scan Complete", "Display categorized results?"))
                    .await;
                if show == Some(true) {
                    self.prompter
                        .show_results(summarize(&session.layout, &session.registry))
                        .await;
                }
            }
            SessionState::Failed(step) => {
                let reason = session
                    .results
                    .iter()
                    .rev()
                    .find_map(|r| match &r.outcome {
                        StepOutcome::Failed(reason) => Some(reason.clone()),
                        _ => None,
                    })
                    .unwrap_or_default();
                self.prompter
                    .notify(Notice::error("Scan Failed", format!("{step} Failed: {reason}")))
                    .await;
            }
            _ => {}
        }

        SessionReport {
            state,
            session_dir: Some(session.layout.root().to_path_buf()),
            hosts: session.registry.len(),
            results: session.results,
        }
    }

    /// Asks for range, interface and directory name, in that order.
    /// `None` as soon as the operator backs out of any prompt.
    pub async fn collect_params(&self, state: &mut SessionState) -> Option<SessionParams> {
        transition(state, SessionState::CollectingRange);
        let range = loop {
            let input = self
                .prompter
                .input(InputPrompt::new(TITLE, "Enter IP range (e.g., 192.168.1.0/24):"))
                .await?;
            match input.parse::<ScanRange>() {
                Ok(range) => break range,
                Err(e) => self.reject(e).await,
            }
        };

        transition(state, SessionState::CollectingInterface);
        let interface = self.select_interface(&range).await?;

        transition(state, SessionState::CollectingDirectory);
        let prefill = interface.vlan.map(|id| format!("vlan{id}")).unwrap_or_default();
        let dir_name = loop {
            let input = self
                .prompter
                .input(InputPrompt::new(TITLE, "Enter directory name for hostfiles:").prefilled(prefill.clone()))
                .await?;
            match validate_dir_name(&input) {
                Ok(name) => break name,
                Err(e) => self.reject(e).await,
            }
        };

        Some(SessionParams {
            range,
            interface,
            dir_name,
        })
    }

    async fn select_interface(&self, range: &ScanRange) -> Option<InterfaceSelection> {
        let interfaces = self.system.get_network_interfaces().unwrap_or_else(|e| {
            warn!("Could not list local interfaces: {e}");
            Vec::new()
        });

        match interface::detect_for_range(range, &interfaces) {
            Some(detected) => {
                let vlan = detected
                    .vlan
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "none".into());
                let message = format!(
                    "Detected Interface: {}\nDetected VLAN ID: {vlan}\nDo you want to use these settings?",
                    detected.name
                );
                if self
                    .prompter
                    .confirm(ConfirmPrompt::new("Interface Detection", message))
                    .await?
                {
                    return Some(detected);
                }
            }
            None => debug!("No local interface has an address inside {range}"),
        }

        loop {
            let input = self
                .prompter
                .input(InputPrompt::new(TITLE, "Enter the network interface (e.g., eth0 or eth0.100):"))
                .await?;

            let selection = if interfaces.is_empty() {
                input.parse::<InterfaceSelection>()
            } else {
                interface::validate(&input, &interfaces)
            };
            match selection {
                Ok(selection) => return Some(selection),
                Err(e) => self.reject(e).await,
            }
        }
    }

    async fn reject(&self, err: ScanError) {
        debug!("Rejected input: {err}");
        let message = match err {
            ScanError::InputInvalid(message) => message,
            other => other.to_string(),
        };
        self.prompter.notify(Notice::error("Invalid Input", message)).await;
    }

    /// Runs every step of `session` in order and returns the final state.
    ///
    /// A critical failure, or any I/O failure, stops the session. A
    /// non-critical failure is reported to `sink` and the next step runs.
    /// Cancellation is checked before every step and propagated into every
    /// tool run.
    pub async fn execute(&self, session: &mut ScanSession, sink: &dyn OutputSink) -> SessionState {
        let steps = PipelineStep::template();

        let prepared = async {
            session.layout.create().await?;
            session.layout.clear_artifacts().await
        };
        if let Err(e) = prepared.await {
            error!("{e}");
            sink.line(StyledLine::error(e.to_string()));
            session.results = steps
                .iter()
                .map(|step| StepResult::new(step, StepOutcome::Skipped))
                .collect();
            session.state = SessionState::Failed("Create Output Directory".into());
            return session.state.clone();
        }

        let ctx = StepContext {
            config: &self.config,
            runner: self.runner.as_ref(),
            vendors: self.vendors.as_ref(),
            sink,
        };

        let mut end: Option<SessionState> = None;
        for (index, step) in steps.iter().enumerate() {
            if end.is_some() {
                session.results.push(StepResult::new(step, StepOutcome::Skipped));
                continue;
            }
            if session.cancel.is_cancelled() {
                info!("Scan cancelled before {}", step.name);
                session.results.push(StepResult::new(step, StepOutcome::Skipped));
                end = Some(SessionState::Cancelled);
                continue;
            }

            transition(&mut session.state, SessionState::Running(index));
            sink.line(StyledLine::info(format!("Running {}...", step.name)));

            let outcome = match ctx.run(step, session).await {
                Ok(artifact) => {
                    info!("{} completed", step.name);
                    sink.line(StyledLine::success(format!("{} completed", step.name)));
                    StepOutcome::Succeeded(artifact)
                }
                Err(e) if e.is_cancelled() || session.cancel.is_cancelled() => {
                    info!("{} cancelled", step.name);
                    end = Some(SessionState::Cancelled);
                    StepOutcome::Cancelled
                }
                Err(e) if step.criticality == Criticality::Critical || e.is_io() => {
                    error!("{} failed: {e}", step.name);
                    sink.line(StyledLine::error(format!("{} failed: {e}", step.name)));
                    end = Some(SessionState::Failed(step.name.to_string()));
                    StepOutcome::Failed(e.to_string())
                }
                Err(e) => {
                    warn!("{} failed, continuing: {e}", step.name);
                    sink.line(StyledLine::warning(format!("{} failed: {e}. Continuing.", step.name)));
                    StepOutcome::Failed(e.to_string())
                }
            };
            session.results.push(StepResult::new(step, outcome));
        }

        transition(&mut session.state, end.unwrap_or(SessionState::Completed));
        session.state.clone()
    }
}

fn transition(state: &mut SessionState, next: SessionState) {
    debug!("Session {state} -> {next}");
    *state = next;
}

fn banner(state: &SessionState) -> Notice {
    match state {
        SessionState::Completed => Notice::success("Scan Complete", "All scans completed successfully."),
        SessionState::Failed(step) => Notice::error("Scan Failed", format!("{step} Failed")),
        _ => Notice::info("Scan Canceled", "Scan Canceled"),
    }
}

/// Categorized hosts grouped for display.
pub fn summarize(layout: &SessionLayout, registry: &HostRegistry) -> ResultSummary {
    ResultSummary {
        session_dir: layout.root().to_path_buf(),
        groups: registry
            .partition()
            .into_iter()
            .map(|(category, hosts)| (category, hosts.into_iter().cloned().collect()))
            .collect(),
    }
}

fn validate_dir_name(input: &str) -> Result<String, ScanError> {
    let name = input.trim();
    if name.is_empty() {
        return Err(ScanError::InputInvalid(
            "Directory name cannot be empty. Please enter a valid directory name.".into(),
        ));
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(ScanError::InputInvalid(format!(
            "'{name}' is not a plain directory name"
        )));
    }
    Ok(name.to_string())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
