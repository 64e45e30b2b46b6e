//! The fixed step template and what each step does.

use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use netsift_common::config::Config;
use netsift_common::error::ScanError;
use netsift_common::host::Category;
use netsift_common::vendors::VendorRepository;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::session::{ScanSession, SessionLayout, remove_stale};
use crate::categorize::Categorizer;
use crate::parsers;
use crate::prompt::OutputSink;
use crate::registry::HostRegistry;
use crate::surface::StyledLine;
use crate::tools::{Invocation, OutputLine, ToolRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criticality {
    /// Failure ends the session.
    Critical,
    /// Failure is reported and the next step runs anyway.
    NonCritical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    AddressDiscovery,
    Reachability,
    ReverseLookup,
    Fingerprint,
    Aggregate,
    Topology,
    Categorize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStep {
    pub name: &'static str,
    pub kind: StepKind,
    pub criticality: Criticality,
}

impl PipelineStep {
    const fn new(name: &'static str, kind: StepKind, criticality: Criticality) -> Self {
        Self {
            name,
            kind,
            criticality,
        }
    }

    /// Every session runs these, in this order.
    pub const fn template() -> [PipelineStep; 7] {
        use Criticality::*;
        [
            Self::new("ARP Scan", StepKind::AddressDiscovery, Critical),
            Self::new("Ping Scan", StepKind::Reachability, NonCritical),
            Self::new("DNS Reverse Lookup", StepKind::ReverseLookup, NonCritical),
            Self::new("Windows OS Discovery", StepKind::Fingerprint, NonCritical),
            Self::new("Create Hostfile", StepKind::Aggregate, Critical),
            Self::new("Nmap Discovery Scan", StepKind::Topology, Critical),
            Self::new("Categorize Hosts", StepKind::Categorize, NonCritical),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The artifact the step left behind.
    Succeeded(PathBuf),
    Failed(String),
    Cancelled,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub name: &'static str,
    pub kind: StepKind,
    pub criticality: Criticality,
    pub outcome: StepOutcome,
}

impl StepResult {
    pub fn new(step: &PipelineStep, outcome: StepOutcome) -> Self {
        Self {
            name: step.name,
            kind: step.kind,
            criticality: step.criticality,
            outcome,
        }
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            StepOutcome::Succeeded(path) => write!(f, "{}: {}", self.name, path.display()),
            StepOutcome::Failed(reason) => write!(f, "{}: failed ({reason})", self.name),
            StepOutcome::Cancelled => write!(f, "{}: cancelled", self.name),
            StepOutcome::Skipped => write!(f, "{}: skipped", self.name),
        }
    }
}

/// What a step needs besides the session itself.
pub(super) struct StepContext<'a> {
    pub config: &'a Config,
    pub runner: &'a dyn ToolRunner,
    pub vendors: &'a dyn VendorRepository,
    pub sink: &'a dyn OutputSink,
}

impl StepContext<'_> {
    pub async fn run(&self, step: &PipelineStep, session: &mut ScanSession) -> Result<PathBuf, ScanError> {
        let layout = session.layout.clone();
        let iface = &session.params.interface;
        let cancel = &session.cancel;

        match step.kind {
            StepKind::AddressDiscovery => {
                let invocation = Invocation::address_discovery(self.config, &session.params.range, iface);
                self.stream(&invocation, cancel, Some(&layout.arp())).await?;
                Ok(layout.arp())
            }
            StepKind::Reachability => {
                let invocation = Invocation::reachability(self.config, &session.params.range, iface);
                self.stream(&invocation, cancel, Some(&layout.ping())).await?;
                Ok(layout.ping())
            }
            StepKind::ReverseLookup => self.reverse_lookup(&layout, cancel).await,
            StepKind::Fingerprint => {
                require(&layout.ping(), "fingerprint", "no reachability results to fingerprint").await?;
                let invocation = Invocation::fingerprint(self.config, &layout.ping(), &layout.fingerprint(), iface);
                self.stream(&invocation, cancel, None).await?;
                require(&layout.fingerprint(), &invocation.program, "no grepable output was written").await?;
                Ok(layout.fingerprint())
            }
            StepKind::Aggregate => self.aggregate(&layout).await,
            StepKind::Topology => {
                let invocation = Invocation::topology(self.config, &layout.host_list(), &layout.topology(), iface);
                self.stream(&invocation, cancel, None).await?;
                require(&layout.topology(), &invocation.program, "no XML output was written").await?;
                Ok(layout.topology())
            }
            StepKind::Categorize => {
                let registry = recategorize(&layout, self.config, self.vendors).await?;
                if cancel.is_cancelled() {
                    return Err(ScanError::Cancelled);
                }
                let report = write_categories(&layout, &registry).await?;
                for (category, hosts) in registry.partition() {
                    self.sink
                        .line(StyledLine::info(format!("{category}: {} hosts", hosts.len())));
                }
                session.registry = registry;
                Ok(report)
            }
        }
    }

    /// Runs `invocation` to completion, echoing its output to the sink and
    /// copying stdout into `capture` line by line.
    async fn stream(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
        capture: Option<&Path>,
    ) -> Result<(), ScanError> {
        self.sink
            .line(StyledLine::plain(format!("$ {}", invocation.command_line())));
        let token = cancel.child_token();
        let mut run = self.runner.run(invocation, token.clone()).await?;

        let mut artifact = match capture {
            Some(path) => match Artifact::create(path).await {
                Ok(artifact) => Some(artifact),
                Err(e) => {
                    token.cancel();
                    return Err(e);
                }
            },
            None => None,
        };
        let mut write_error = None;

        while let Some(line) = run.next_line().await {
            match line {
                OutputLine::Stdout(text) => {
                    if let Some(artifact) = artifact.as_mut() {
                        if let Err(e) = artifact.write_line(&text).await {
                            write_error.get_or_insert(e);
                        }
                    }
                    self.sink.line(StyledLine::plain(text));
                }
                OutputLine::Stderr(text) => self.sink.line(StyledLine::warning(text)),
            }
        }

        let status = run.finish().await;
        if let Some(artifact) = artifact {
            if let Err(e) = artifact.close().await {
                write_error.get_or_insert(e);
            }
        }

        match (status, write_error) {
            (Err(ScanError::Cancelled), _) => Err(ScanError::Cancelled),
            (_, Some(e)) => Err(e),
            (status, None) => status,
        }
    }

    /// One resolver call per reachable address. A failed lookup is recorded
    /// as having no PTR record; it does not fail the step.
    async fn reverse_lookup(&self, layout: &SessionLayout, cancel: &CancellationToken) -> Result<PathBuf, ScanError> {
        let raw = require(&layout.ping(), "reverse lookup", "no reachability results to resolve").await?;
        let addrs = parsers::reachability::parse(&raw).records;

        let mut artifact = Artifact::create(&layout.reverse()).await?;
        let mut outcome = Ok(());

        for addr in addrs {
            if cancel.is_cancelled() {
                outcome = Err(ScanError::Cancelled);
                break;
            }

            let name = match self.resolve(addr, cancel).await {
                Ok(name) => name,
                Err(ScanError::Cancelled) => {
                    outcome = Err(ScanError::Cancelled);
                    break;
                }
                Err(e) => {
                    debug!("Reverse lookup of {addr} failed: {e}");
                    None
                }
            };

            let line = parsers::reverse::render_line(addr, name.as_deref());
            self.sink.line(StyledLine::plain(line.clone()));
            if let Err(e) = artifact.write_line(&line).await {
                outcome = Err(e);
                break;
            }
        }

        let closed = artifact.close().await;
        outcome?;
        closed?;
        Ok(layout.reverse())
    }

    async fn resolve(&self, addr: IpAddr, cancel: &CancellationToken) -> Result<Option<String>, ScanError> {
        let invocation = Invocation::reverse_lookup(self.config, addr);
        let mut run = self.runner.run(&invocation, cancel.clone()).await?;

        let mut name = None;
        while let Some(line) = run.next_line().await {
            if let OutputLine::Stdout(text) = line {
                if name.is_none() {
                    name = ptr_name(&text);
                }
            }
        }
        run.finish().await?;
        Ok(name)
    }

    /// Union of every address ARP and the reachability sweep found, in
    /// address order.
    async fn aggregate(&self, layout: &SessionLayout) -> Result<PathBuf, ScanError> {
        let mut addrs: BTreeSet<IpAddr> = BTreeSet::new();

        if let Some(raw) = read_optional(&layout.arp()).await? {
            addrs.extend(parsers::arp::parse(&raw).records.into_iter().map(|e| e.addr));
        }
        if let Some(raw) = read_optional(&layout.ping()).await? {
            addrs.extend(parsers::reachability::parse(&raw).records);
        }

        if addrs.is_empty() {
            return Err(ScanError::EmptyHostList);
        }

        let path = layout.host_list();
        let mut artifact = Artifact::create(&path).await?;
        for addr in &addrs {
            artifact.write_line(&addr.to_string()).await?;
        }
        artifact.close().await?;

        self.sink
            .line(StyledLine::info(format!("{} unique hosts written to {}", addrs.len(), path.display())));
        Ok(path)
    }
}

/// The PTR name on one line of `dig +short` output. `;;` lines are
/// diagnostics, not answers.
fn ptr_name(line: &str) -> Option<String> {
    let name = line.trim();
    if name.is_empty() || name.starts_with(';') {
        return None;
    }
    Some(name.to_string())
}

/// Builds the registry from a session's artifacts and categorizes it.
pub async fn recategorize(
    layout: &SessionLayout,
    config: &Config,
    vendors: &dyn VendorRepository,
) -> Result<HostRegistry, ScanError> {
    let mut registry = HostRegistry::from_artifacts(layout).await?;
    registry.enrich_vendors(vendors);
    registry.categorize(&Categorizer::new(config.heuristics.clone()));
    Ok(registry)
}

/// Writes one address-per-line file for every non-empty category plus the
/// JSON report, replacing whatever a previous run left behind.
pub async fn write_categories(layout: &SessionLayout, registry: &HostRegistry) -> Result<PathBuf, ScanError> {
    for category in Category::ALL {
        remove_stale(&layout.category_file(category)).await?;
    }

    for (category, hosts) in registry.partition() {
        let path = layout.category_file(category);
        let mut artifact = Artifact::create(&path).await?;
        for host in hosts {
            artifact.write_line(&host.addr.to_string()).await?;
        }
        artifact.close().await?;
    }

    let report = layout.report();
    let records: Vec<_> = registry.records().collect();
    let json = serde_json::to_vec_pretty(&records)
        .map_err(|e| ScanError::io("failed to encode host report", e.into()))?;
    tokio::fs::write(&report, json)
        .await
        .map_err(|e| ScanError::io_at("write", &report, e))?;

    info!("Categorized {} hosts into {}", registry.len(), layout.root().display());
    Ok(report)
}

/// Buffered artifact writer that remembers its path for error messages.
struct Artifact {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl Artifact {
    async fn create(path: &Path) -> Result<Self, ScanError> {
        let file = File::create(path)
            .await
            .map_err(|e| ScanError::io_at("create", path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    async fn write_line(&mut self, line: &str) -> Result<(), ScanError> {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .map_err(|e| ScanError::io_at("write", &self.path, e))
    }

    async fn close(mut self) -> Result<(), ScanError> {
        self.writer
            .flush()
            .await
            .map_err(|e| ScanError::io_at("flush", &self.path, e))
    }
}

/// Reads an input artifact another step was supposed to produce.
async fn require(path: &Path, tool: &str, reason: &str) -> Result<String, ScanError> {
    match read_optional(path).await? {
        Some(raw) => Ok(raw),
        None => Err(ScanError::tool_failed(tool, format!("{reason} ({} is missing)", path.display()))),
    }
}

async fn read_optional(path: &Path) -> Result<Option<String>, ScanError> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ScanError::io_at("read", path, e)),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
