//! # Runtime Configuration
//!
//! Settings shared by the scan pipeline and the categorization engine.
//!
//! Everything here has a sensible default, so a missing configuration file is
//! never an error. A file that exists but cannot be parsed is.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

const CONFIG_DIR: &str = "netsift";
const CONFIG_FILE: &str = "netsift.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root under which the hostfiles tree is created.
    pub working_directory: PathBuf,
    /// Wall-clock ceiling for the fingerprint sweep.
    ///
    /// The other tools run until they exit or the session is cancelled.
    pub fingerprint_ceiling_secs: u64,
    /// How long a cancelled tool is given to exit after being killed.
    pub kill_grace_millis: u64,
    pub tools: ToolPaths,
    pub heuristics: Heuristics,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            working_directory: PathBuf::from("."),
            fingerprint_ceiling_secs: 30 * 60,
            kill_grace_millis: 2_000,
            tools: ToolPaths::default(),
            heuristics: Heuristics::default(),
        }
    }
}

impl Config {
    /// Loads the configuration from `path`, or from the per-user default
    /// location when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path: PathBuf = match path {
            Some(path) => path.to_path_buf(),
            None => match default_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            tracing::debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading configuration {}", path.display()))?;
        let cfg: Config = serde_json::from_str(&raw)
            .with_context(|| format!("parsing configuration {}", path.display()))?;
        Ok(cfg)
    }

    pub fn fingerprint_ceiling(&self) -> Duration {
        Duration::from_secs(self.fingerprint_ceiling_secs)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_millis)
    }
}

/// `<config dir>/netsift/netsift.json`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Program names of the wrapped probing tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub arp_scan: String,
    pub fping: String,
    pub dig: String,
    pub nmap: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            arp_scan: "arp-scan".into(),
            fping: "fping".into(),
            dig: "dig".into(),
            nmap: "nmap".into(),
        }
    }
}

/// Calibration of the host categorization rules.
///
/// None of these values are derived from an invariant; they are product
/// decisions and can be tuned per engagement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Heuristics {
    /// Minimum OS match accuracy (0-100) for the fingerprint rule to apply.
    pub os_confidence_threshold: u8,
    /// Minimum number of open management ports for the network equipment rule.
    pub network_port_threshold: usize,
    pub ssh_port: u16,
    pub snmp_port: u16,
    pub smb_port: u16,
    pub netbios_ports: Vec<u16>,
    pub web_ports: Vec<u16>,
    /// Ports whose extra-info may carry a certificate subject.
    pub tls_ports: Vec<u16>,
    pub firewall_ports: Vec<u16>,
    pub network_management_ports: Vec<u16>,
    /// RAW/JetDirect, LPD and IPP.
    pub printer_ports: Vec<u16>,
    /// Lowercase fragments of an OS detail string naming a desktop Windows.
    pub desktop_windows_versions: Vec<String>,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            os_confidence_threshold: 80,
            network_port_threshold: 3,
            ssh_port: 22,
            snmp_port: 161,
            smb_port: 445,
            netbios_ports: vec![135, 137, 138, 139],
            web_ports: vec![80, 443],
            tls_ports: vec![443, 8443],
            firewall_ports: vec![22, 161, 162, 500, 4443, 8443],
            network_management_ports: vec![22, 23, 80, 443, 161, 162, 514, 830, 3389, 8443],
            printer_ports: vec![9100, 515, 631],
            desktop_windows_versions: vec!["windows 10".into(), "windows 11".into()],
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
