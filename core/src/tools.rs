//! # Tool Invocation Adapter
//!
//! Every probing capability is delegated to an external program. This module
//! describes *what* to run ([`Invocation`]) and defines the uniform contract
//! for running it ([`ToolRunner`]): a finite, non-restartable stream of
//! output lines plus a final status.
//!
//! High-level code depends on the [`ToolRunner`] abstraction only; the
//! concrete [`ProcessRunner`] spawns real processes and tests substitute
//! canned output.

use std::fmt;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use netsift_common::config::Config;
use netsift_common::error::ScanError;
use netsift_common::network::interface::InterfaceSelection;
use netsift_common::network::range::ScanRange;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

mod process;

pub use process::ProcessRunner;

/// Ports probed by the topology scan to coax a reply out of filtering hosts.
const TOPOLOGY_SYN_PROBES: &str = "-PS22,135-139,445,80,443,5060,2000,3389,53,88,389,636,3268,123";
const TOPOLOGY_UDP_PROBES: &str = "-PU53,161";
const FINGERPRINT_PORTS: &str = "-p135,139,445";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    AddressDiscovery,
    Reachability,
    ReverseLookup,
    Fingerprint,
    Topology,
}

impl Capability {
    pub fn label(self) -> &'static str {
        match self {
            Capability::AddressDiscovery => "address discovery",
            Capability::Reachability => "reachability sweep",
            Capability::ReverseLookup => "reverse lookup",
            Capability::Fingerprint => "OS fingerprint",
            Capability::Topology => "topology scan",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A fully resolved command line for one capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub capability: Capability,
    pub program: String,
    pub args: Vec<String>,
    /// Exit codes that count as success.
    pub ok_exit_codes: Vec<i32>,
    /// Wall-clock limit, after which the process is killed.
    pub ceiling: Option<Duration>,
}

impl Invocation {
    fn new(capability: Capability, program: &str, args: Vec<String>) -> Self {
        Self {
            capability,
            program: program.to_string(),
            args,
            ok_exit_codes: vec![0],
            ceiling: None,
        }
    }

    /// `arp-scan --interface=<dev> <range>`
    pub fn address_discovery(cfg: &Config, range: &ScanRange, iface: &InterfaceSelection) -> Self {
        Self::new(
            Capability::AddressDiscovery,
            &cfg.tools.arp_scan,
            vec![format!("--interface={}", iface.device()), range.to_string()],
        )
    }

    /// `fping -a -g <range> -I <dev> -q`
    ///
    /// fping exits with 1 when some targets did not answer, which is the
    /// normal case for a sweep.
    pub fn reachability(cfg: &Config, range: &ScanRange, iface: &InterfaceSelection) -> Self {
        let mut invocation = Self::new(
            Capability::Reachability,
            &cfg.tools.fping,
            args(&["-a", "-g", &range.to_string(), "-I", &iface.device(), "-q"]),
        );
        invocation.ok_exit_codes = vec![0, 1];
        invocation
    }

    /// `dig -x <addr> +short`
    pub fn reverse_lookup(cfg: &Config, addr: IpAddr) -> Self {
        Self::new(
            Capability::ReverseLookup,
            &cfg.tools.dig,
            args(&["-x", &addr.to_string(), "+short"]),
        )
    }

    /// Grepable SMB/OS sweep of the reachable hosts, written to `output` by nmap.
    pub fn fingerprint(cfg: &Config, targets: &Path, output: &Path, iface: &InterfaceSelection) -> Self {
        let mut invocation = Self::new(
            Capability::Fingerprint,
            &cfg.tools.nmap,
            args(&[
                "-Pn",
                "-n",
                "-O",
                "--osscan-guess",
                FINGERPRINT_PORTS,
                "--script=smb-os-discovery",
                "-oG",
                &output.display().to_string(),
                "-iL",
                &targets.display().to_string(),
                "-e",
                &iface.device(),
            ]),
        );
        invocation.ceiling = Some(cfg.fingerprint_ceiling());
        invocation
    }

    /// Service, OS and topology scan of the aggregated host list, written to
    /// `output` as XML by nmap.
    pub fn topology(cfg: &Config, targets: &Path, output: &Path, iface: &InterfaceSelection) -> Self {
        Self::new(
            Capability::Topology,
            &cfg.tools.nmap,
            args(&[
                "-PE",
                "-PP",
                "-PM",
                TOPOLOGY_SYN_PROBES,
                TOPOLOGY_UDP_PROBES,
                "-n",
                "--top-ports",
                "10",
                "-sV",
                "-O",
                "--script=smb-os-discovery",
                "--min-hostgroup",
                "64",
                "--min-parallelism",
                "32",
                "--host-timeout",
                "10m",
                "-iL",
                &targets.display().to_string(),
                "-e",
                &iface.device(),
                "-oX",
                &output.display().to_string(),
            ]),
        )
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// A running (or finished) tool.
///
/// Lines arrive in the order each stream produced them. The run is over once
/// [`ToolRun::finish`] returns.
pub struct ToolRun {
    lines: mpsc::Receiver<OutputLine>,
    status: JoinHandle<Result<(), ScanError>>,
}

impl ToolRun {
    pub fn new(lines: mpsc::Receiver<OutputLine>, status: JoinHandle<Result<(), ScanError>>) -> Self {
        Self { lines, status }
    }

    /// A run whose output is already known. Must be called inside a runtime.
    pub fn completed(output: Vec<OutputLine>, result: Result<(), ScanError>) -> Self {
        let (tx, rx) = mpsc::channel(output.len().max(1));
        for line in output {
            let _ = tx.try_send(line);
        }
        Self::new(rx, tokio::spawn(async move { result }))
    }

    pub async fn next_line(&mut self) -> Option<OutputLine> {
        self.lines.recv().await
    }

    /// Drains whatever output is left, then waits for the exit status.
    pub async fn finish(mut self) -> Result<(), ScanError> {
        while self.lines.recv().await.is_some() {}
        self.status
            .await
            .map_err(|e| ScanError::tool_failed("supervisor", e.to_string()))?
    }
}

#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Starts `invocation`. Triggering `cancel` stops the process and makes
    /// the run finish with [`ScanError::Cancelled`].
    async fn run(&self, invocation: &Invocation, cancel: CancellationToken) -> Result<ToolRun, ScanError>;
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
