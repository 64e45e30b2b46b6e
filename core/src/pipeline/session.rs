//! Session state and on-disk layout.

use std::fmt;
use std::path::{Path, PathBuf};

use netsift_common::error::ScanError;
use netsift_common::host::Category;
use netsift_common::network::interface::InterfaceSelection;
use netsift_common::network::range::ScanRange;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::StepResult;
use crate::registry::HostRegistry;

const DEFAULT_HOSTFILES_DIR: &str = "Hostfiles";
const HOSTFILES_MARKER: &str = "hostfiles";
const SCANS_DIR: &str = "scans";
const HOST_LIST_FILE: &str = "hosts_found_up.txt";
const REPORT_FILE: &str = "hosts.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    CollectingRange,
    CollectingInterface,
    CollectingDirectory,
    Running(usize),
    Completed,
    Cancelled,
    Failed(String),
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::CollectingRange => f.write_str("collecting range"),
            SessionState::CollectingInterface => f.write_str("collecting interface"),
            SessionState::CollectingDirectory => f.write_str("collecting directory"),
            SessionState::Running(step) => write!(f, "running step {}", step + 1),
            SessionState::Completed => f.write_str("completed"),
            SessionState::Cancelled => f.write_str("cancelled"),
            SessionState::Failed(step) => write!(f, "{step} failed"),
        }
    }
}

/// Everything the operator is asked for before a scan starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    pub range: ScanRange,
    pub interface: InterfaceSelection,
    pub dir_name: String,
}

/// Paths of one session: `<workdir>/<hostfiles>/<name>/...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLayout {
    root: PathBuf,
}

impl SessionLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Places session `name` under the hostfiles directory of `working_dir`.
    pub fn resolve(working_dir: &Path, name: &str) -> Self {
        Self::new(hostfiles_dir(working_dir).join(name))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scans_dir(&self) -> PathBuf {
        self.root.join(SCANS_DIR)
    }

    pub fn arp(&self) -> PathBuf {
        self.scans_dir().join("arp.txt")
    }

    pub fn ping(&self) -> PathBuf {
        self.scans_dir().join("ping.txt")
    }

    pub fn reverse(&self) -> PathBuf {
        self.scans_dir().join("dns-reverse.txt")
    }

    pub fn fingerprint(&self) -> PathBuf {
        self.scans_dir().join("os-discovery.txt")
    }

    pub fn topology(&self) -> PathBuf {
        self.scans_dir().join("nmap.xml")
    }

    pub fn host_list(&self) -> PathBuf {
        self.root.join(HOST_LIST_FILE)
    }

    pub fn category_file(&self, category: Category) -> PathBuf {
        self.root.join(category.file_name())
    }

    pub fn report(&self) -> PathBuf {
        self.root.join(REPORT_FILE)
    }

    pub async fn create(&self) -> Result<(), ScanError> {
        let scans = self.scans_dir();
        tokio::fs::create_dir_all(&scans)
            .await
            .map_err(|e| ScanError::io_at("create", &scans, e))?;
        debug!("Session directory ready at {}", self.root.display());
        Ok(())
    }

    /// Removes everything a previous run in this directory produced, so a
    /// failed step leaves no artifact instead of last run's.
    pub async fn clear_artifacts(&self) -> Result<(), ScanError> {
        let stale = [
            self.arp(),
            self.ping(),
            self.reverse(),
            self.fingerprint(),
            self.topology(),
            self.host_list(),
            self.report(),
        ];
        for path in stale.into_iter().chain(Category::ALL.map(|c| self.category_file(c))) {
            remove_stale(&path).await?;
        }
        Ok(())
    }
}

/// Deletes `path` if it exists.
pub(crate) async fn remove_stale(path: &Path) -> Result<(), ScanError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ScanError::io_at("remove", path, e)),
    }
}

/// The first directory in `working_dir` whose name mentions "hostfiles"
/// (any case), or `<working_dir>/Hostfiles` when there is none.
pub fn hostfiles_dir(working_dir: &Path) -> PathBuf {
    let mut existing: Vec<PathBuf> = std::fs::read_dir(working_dir)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .to_lowercase()
                .contains(HOSTFILES_MARKER)
        })
        .map(|entry| entry.path())
        .collect();
    existing.sort();

    existing
        .into_iter()
        .next()
        .unwrap_or_else(|| working_dir.join(DEFAULT_HOSTFILES_DIR))
}

/// One run of the pipeline. Owned by the task executing it.
pub struct ScanSession {
    pub params: SessionParams,
    pub layout: SessionLayout,
    pub cancel: CancellationToken,
    pub state: SessionState,
    pub results: Vec<StepResult>,
    /// Filled by the categorization step.
    pub registry: HostRegistry,
}

impl ScanSession {
    pub fn new(params: SessionParams, layout: SessionLayout, cancel: CancellationToken) -> Self {
        Self {
            params,
            layout,
            cancel,
            state: SessionState::Running(0),
            results: Vec::new(),
            registry: HostRegistry::new(),
        }
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
