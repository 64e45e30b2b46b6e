//! # Host Model
//!
//! One [`HostRecord`] per unique address per session. Records are built up
//! in stages: the address first (ARP / reachability), then ports and OS
//! guesses from fingerprinting, then the vendor lookup. The category is
//! assigned last and exactly once.

use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;

use pnet::util::MacAddr;
use serde::{Serialize, Serializer};

/// Device class a host is sorted into for the audit report.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Category {
    WindowsServer,
    WindowsClient,
    WindowsUnknown,
    Linux,
    Printer,
    #[serde(rename = "UPS")]
    Ups,
    #[serde(rename = "NAS")]
    Nas,
    Firewall,
    RouterSwitch,
    LightsOutManagement,
    #[default]
    Unknown,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::WindowsServer,
        Category::WindowsClient,
        Category::WindowsUnknown,
        Category::Linux,
        Category::Printer,
        Category::Ups,
        Category::Nas,
        Category::Firewall,
        Category::RouterSwitch,
        Category::LightsOutManagement,
        Category::Unknown,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::WindowsServer => "Windows_Server",
            Category::WindowsClient => "Windows_Client",
            Category::WindowsUnknown => "Windows_Unknown",
            Category::Linux => "Linux",
            Category::Printer => "Printers",
            Category::Ups => "UPS",
            Category::Nas => "NAS",
            Category::Firewall => "Firewalls",
            Category::RouterSwitch => "Routers_Switches",
            Category::LightsOutManagement => "Lights_Out_Management",
            Category::Unknown => "Unknown",
        }
    }

    /// Name of the hostfile holding every address of this category.
    pub fn file_name(self) -> String {
        format!("{}.txt", self.label())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInfo {
    pub name: String,
    pub product: String,
    pub version: String,
    pub extra_info: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortRecord {
    pub protocol: String,
    pub port: u16,
    pub state: String,
    pub service: ServiceInfo,
}

impl PortRecord {
    pub fn new(protocol: &str, port: u16, state: &str) -> Self {
        Self {
            protocol: protocol.to_string(),
            port,
            state: state.to_string(),
            service: ServiceInfo::default(),
        }
    }

    pub fn with_service(mut self, service: ServiceInfo) -> Self {
        self.service = service;
        self
    }

    pub fn is_open(&self) -> bool {
        self.state.eq_ignore_ascii_case("open")
    }
}

/// Best OS match reported by the fingerprinting tools.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct OsGuess {
    pub vendor: String,
    pub family: String,
    pub generation: String,
    pub detail: String,
    /// 0-100
    pub confidence: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostRecord {
    pub addr: IpAddr,
    #[serde(serialize_with = "serialize_mac")]
    pub mac: Option<MacAddr>,
    pub mac_vendor: Option<String>,
    pub hostnames: BTreeSet<String>,
    /// Ordered by protocol, then port number.
    pub ports: Vec<PortRecord>,
    pub os: Option<OsGuess>,
    pub category: Category,
}

impl HostRecord {
    pub fn new(addr: IpAddr) -> Self {
        Self {
            addr,
            mac: None,
            mac_vendor: None,
            hostnames: BTreeSet::new(),
            ports: Vec::new(),
            os: None,
            category: Category::Unknown,
        }
    }

    pub fn with_mac(mut self, mac: MacAddr) -> Self {
        self.mac = Some(mac);
        self
    }

    pub fn with_vendor(mut self, vendor: &str) -> Self {
        self.mac_vendor = Some(vendor.to_string());
        self
    }

    pub fn with_port(mut self, port: PortRecord) -> Self {
        self.upsert_port(port);
        self
    }

    pub fn with_os(mut self, os: OsGuess) -> Self {
        self.os = Some(os);
        self
    }

    /// Inserts `port`, replacing an existing entry for the same
    /// protocol/port pair. Service details already known are kept when the
    /// newer entry carries none.
    pub fn upsert_port(&mut self, port: PortRecord) {
        let key = (port.protocol.as_str(), port.port);
        match self
            .ports
            .binary_search_by(|existing| (existing.protocol.as_str(), existing.port).cmp(&key))
        {
            Ok(idx) => {
                let existing = &mut self.ports[idx];
                existing.state = port.state;
                if port.service != ServiceInfo::default() {
                    existing.service = port.service;
                }
            }
            Err(idx) => self.ports.insert(idx, port),
        }
    }

    pub fn open_ports(&self) -> impl Iterator<Item = &PortRecord> {
        self.ports.iter().filter(|port| port.is_open())
    }

    pub fn has_open_port(&self, port: u16) -> bool {
        self.open_ports().any(|p| p.port == port)
    }
}

fn serialize_mac<S: Serializer>(mac: &Option<MacAddr>, serializer: S) -> Result<S::Ok, S::Error> {
    match mac {
        Some(mac) => serializer.serialize_some(&mac.to_string()),
        None => serializer.serialize_none(),
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
