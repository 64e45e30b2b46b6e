//! # Categorization Engine
//!
//! Sorts every fused [`HostRecord`] into exactly one [`Category`]. Rules are
//! evaluated in a fixed order and the first one that matches wins:
//!
//! 1. MAC vendor table
//! 2. High-confidence OS fingerprint
//! 3. Port and service heuristics (SMB, SSH file sharing, UPS, firewall,
//!    network equipment, printer)
//! 4. [`Category::Unknown`]
//!
//! Every heuristic looks at all of the evidence a host carries before it
//! gives up: the OS vendor, the banner of every open port, and the SNMP
//! extra-info when SNMP is open.

use std::fmt;

use netsift_common::config::Heuristics;
use netsift_common::host::{Category, HostRecord};
use tracing::debug;

/// Ordered: more specific fragments come before the ones they contain.
const MAC_VENDORS: &[(&str, Category)] = &[
    ("hewlett packard enterprise", Category::RouterSwitch),
    ("hewlett packard", Category::Printer),
    ("hp inc", Category::Printer),
    ("lexmark", Category::Printer),
    ("canon", Category::Printer),
    ("brother", Category::Printer),
    ("epson", Category::Printer),
    ("xerox", Category::Printer),
    ("ricoh", Category::Printer),
    ("kyocera", Category::Printer),
    ("konica minolta", Category::Printer),
    ("sharp", Category::Printer),
    ("schneider electric", Category::Ups),
    ("american power conversion", Category::Ups),
    ("apc", Category::Ups),
    ("eaton", Category::Ups),
    ("powerware", Category::Ups),
    ("emerson", Category::Ups),
    ("vertiv", Category::Ups),
    ("liebert", Category::Ups),
    ("cyber power", Category::Ups),
    ("cyberpower", Category::Ups),
    ("tripp-lite", Category::Ups),
    ("tripp lite", Category::Ups),
    ("delta", Category::Ups),
    ("riello", Category::Ups),
    ("synology", Category::Nas),
    ("qnap", Category::Nas),
    ("netapp", Category::Nas),
    ("palo alto", Category::Firewall),
    ("check point", Category::Firewall),
    ("fortinet", Category::Firewall),
    ("cisco systems", Category::Firewall),
    ("sophos", Category::Firewall),
    ("watchguard", Category::Firewall),
    ("sonicwall", Category::Firewall),
    ("juniper", Category::RouterSwitch),
    ("arista", Category::RouterSwitch),
    ("extreme networks", Category::RouterSwitch),
    ("aruba", Category::RouterSwitch),
];

const UPS_VENDORS: &[&str] = &[
    "apc",
    "schneider",
    "eaton",
    "powerware",
    "emerson",
    "vertiv",
    "liebert",
    "cyberpower",
    "tripp lite",
    "delta",
    "riello",
];

const FIREWALL_VENDORS: &[&str] = &[
    "palo alto",
    "checkpoint",
    "check point",
    "fortinet",
    "fortigate",
    "cisco asa",
    "cisco firepower",
    "sophos",
    "watchguard",
    "sonicwall",
    "pfsense",
    "opnsense",
];

const PRINTER_VENDORS: &[&str] = &[
    "hp", "lexmark", "canon", "brother", "epson", "xerox", "ricoh", "kyocera", "konica", "sharp",
];

/// Vendor family, then the banner fragments that identify it.
const NETWORK_VENDORS: &[(&str, &[&str])] = &[
    ("cisco", &["ios", "nexus", "catalyst", "aironet", "meraki", "cisco systems"]),
    ("juniper", &["junos", "juniper networks", "srx", "ex series", "qfx"]),
    ("arista", &["eos", "arista networks", "dcs-"]),
    ("hpe", &["procurve", "aruba", "hp networking", "comware", "provision"]),
    ("extreme", &["extremexos", "extreme networks", "summit", "black diamond"]),
];

const FILE_SHARING_SERVICES: &[&str] = &["nfs", "mountd", "rpcbind"];
const FIREWALL_MARKER: &str = "firewall";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    MacVendor,
    OsFingerprint,
    SmbNetbios,
    SshFileSharing,
    UpsBanner,
    FirewallBanner,
    NetworkEquipment,
    PrinterBanner,
    Fallback,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rule::MacVendor => "mac-vendor",
            Rule::OsFingerprint => "os-fingerprint",
            Rule::SmbNetbios => "smb-netbios",
            Rule::SshFileSharing => "ssh-file-sharing",
            Rule::UpsBanner => "ups",
            Rule::FirewallBanner => "firewall",
            Rule::NetworkEquipment => "network-equipment",
            Rule::PrinterBanner => "printer",
            Rule::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

/// The category of a host and the rule that decided it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub category: Category,
    pub rule: Rule,
    /// Vendor fragment or family that matched, when a vendor decided it.
    pub vendor: Option<&'static str>,
}

impl Verdict {
    fn new(category: Category, rule: Rule) -> Self {
        Self {
            category,
            rule,
            vendor: None,
        }
    }

    fn with_vendor(mut self, vendor: &'static str) -> Self {
        self.vendor = Some(vendor);
        self
    }
}

/// Lowercased text a host offers for vendor matching.
struct Evidence {
    mac_vendor: Option<String>,
    banners: Vec<String>,
    tls_extra_info: Vec<String>,
}

impl Evidence {
    fn collect(host: &HostRecord, heuristics: &Heuristics) -> Self {
        let mut banners = Vec::new();
        if let Some(os) = &host.os {
            banners.push(os.vendor.to_lowercase());
        }

        let mut tls_extra_info = Vec::new();
        for port in host.open_ports() {
            let service = &port.service;
            banners.push(format!("{} {}", service.product, service.version).to_lowercase());
            if port.port == heuristics.snmp_port {
                banners.push(service.extra_info.to_lowercase());
            }
            if heuristics.tls_ports.contains(&port.port) {
                tls_extra_info.push(service.extra_info.to_lowercase());
            }
        }
        banners.retain(|b| !b.trim().is_empty());

        Self {
            mac_vendor: host.mac_vendor.as_ref().map(|v| v.to_lowercase()),
            banners,
            tls_extra_info,
        }
    }

    fn banner_match(&self, vendors: &[&'static str]) -> Option<&'static str> {
        vendors
            .iter()
            .copied()
            .find(|vendor| self.banners.iter().any(|banner| contains_word(banner, vendor)))
    }
}

pub struct Categorizer {
    heuristics: Heuristics,
}

impl Categorizer {
    pub fn new(heuristics: Heuristics) -> Self {
        Self { heuristics }
    }

    /// Deterministic and total: the same record always gets the same verdict,
    /// and every record gets one.
    pub fn classify(&self, host: &HostRecord) -> Verdict {
        let evidence = Evidence::collect(host, &self.heuristics);

        let verdict = by_mac_vendor(&evidence)
            .or_else(|| self.by_os(host))
            .or_else(|| self.by_ports(host, &evidence))
            .unwrap_or_else(|| Verdict::new(Category::Unknown, Rule::Fallback));

        debug!(
            "{} -> {} (rule {}{})",
            host.addr,
            verdict.category,
            verdict.rule,
            verdict.vendor.map(|v| format!(", vendor {v}")).unwrap_or_default()
        );
        verdict
    }

    fn by_os(&self, host: &HostRecord) -> Option<Verdict> {
        let os = host.os.as_ref()?;
        if os.confidence < self.heuristics.os_confidence_threshold {
            return None;
        }

        let family = os.family.to_lowercase();
        let detail = os.detail.to_lowercase();

        let category = if family.contains("windows") {
            if detail.contains("server") {
                Category::WindowsServer
            } else if self
                .heuristics
                .desktop_windows_versions
                .iter()
                .any(|v| detail.contains(&v.to_lowercase()))
            {
                Category::WindowsClient
            } else {
                Category::WindowsUnknown
            }
        } else if family.contains("linux") {
            Category::Linux
        } else {
            return None;
        };

        Some(Verdict::new(category, Rule::OsFingerprint))
    }

    fn by_ports(&self, host: &HostRecord, evidence: &Evidence) -> Option<Verdict> {
        let h = &self.heuristics;
        let open = |port: u16| host.has_open_port(port);
        let any_open = |ports: &[u16]| ports.iter().any(|p| open(*p));

        if open(h.smb_port) && any_open(&h.netbios_ports) {
            return Some(Verdict::new(Category::WindowsUnknown, Rule::SmbNetbios));
        }

        let ssh = open(h.ssh_port) || host.open_ports().any(|p| p.service.name == "ssh");
        let file_sharing = host.open_ports().any(|p| {
            let name = p.service.name.to_lowercase();
            FILE_SHARING_SERVICES.iter().any(|s| name.contains(s))
        });
        if ssh && file_sharing {
            return Some(Verdict::new(Category::Linux, Rule::SshFileSharing));
        }

        let web = any_open(&h.web_ports);

        if web {
            if let Some(vendor) = evidence.banner_match(UPS_VENDORS) {
                return Some(Verdict::new(Category::Ups, Rule::UpsBanner).with_vendor(vendor));
            }
        }

        if web {
            if let Some(vendor) = evidence.banner_match(FIREWALL_VENDORS) {
                return Some(Verdict::new(Category::Firewall, Rule::FirewallBanner).with_vendor(vendor));
            }
            let marked = evidence
                .tls_extra_info
                .iter()
                .any(|info| info.contains(FIREWALL_MARKER));
            if marked || any_open(&h.firewall_ports) {
                return Some(Verdict::new(Category::Firewall, Rule::FirewallBanner));
            }
        }

        let network_family = NETWORK_VENDORS
            .iter()
            .find(|(_, fragments)| evidence.banner_match(fragments).is_some())
            .map(|(family, _)| *family);
        if let Some(family) = network_family {
            return Some(Verdict::new(Category::RouterSwitch, Rule::NetworkEquipment).with_vendor(family));
        }
        let management_ports = h
            .network_management_ports
            .iter()
            .filter(|p| open(**p))
            .count();
        if management_ports >= h.network_port_threshold && open(h.ssh_port) && open(h.snmp_port) {
            return Some(Verdict::new(Category::RouterSwitch, Rule::NetworkEquipment));
        }

        if any_open(&h.printer_ports) {
            if let Some(vendor) = evidence.banner_match(PRINTER_VENDORS) {
                return Some(Verdict::new(Category::Printer, Rule::PrinterBanner).with_vendor(vendor));
            }
        }

        None
    }
}

fn by_mac_vendor(evidence: &Evidence) -> Option<Verdict> {
    let vendor = evidence.mac_vendor.as_deref()?;
    MAC_VENDORS
        .iter()
        .find(|(fragment, _)| vendor.contains(fragment))
        .map(|(fragment, category)| Verdict::new(*category, Rule::MacVendor).with_vendor(*fragment))
}

/// `needle` occurs in `haystack` without being glued to surrounding letters
/// or digits, so "hp" matches "HP LaserJet" but not "PHP".
fn contains_word(haystack: &str, needle: &str) -> bool {
    let glued = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric());
    let check_start = needle.chars().next().is_some_and(|c| c.is_alphanumeric());
    let check_end = needle.chars().last().is_some_and(|c| c.is_alphanumeric());

    haystack.match_indices(needle).any(|(idx, _)| {
        let before = haystack[..idx].chars().next_back();
        let after = haystack[idx + needle.len()..].chars().next();
        !(check_start && glued(before)) && !(check_end && glued(after))
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
