//! # Interface Selection
//!
//! Picks the local interface a scan is sent through. Operators write VLAN
//! subinterfaces as `<parent>.<tag>` (e.g. `eth0.100`), which is also how
//! Linux names them.

use std::fmt;
use std::str::FromStr;

use pnet::datalink::NetworkInterface;

use crate::error::ScanError;
use crate::network::range::ScanRange;
use crate::utils::interface::NetworkInterfaceExtension;

const WIRED_PREFIXES: &[&str] = &["eth", "en", "em"];

/// Interface name plus optional 802.1Q tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceSelection {
    pub name: String,
    pub vlan: Option<u16>,
}

impl InterfaceSelection {
    pub fn new(name: &str, vlan: Option<u16>) -> Self {
        Self {
            name: name.to_string(),
            vlan,
        }
    }

    /// The device name handed to the probing tools.
    pub fn device(&self) -> String {
        match self.vlan {
            Some(tag) => format!("{}.{}", self.name, tag),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for InterfaceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.device())
    }
}

impl FromStr for InterfaceSelection {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ScanError::InputInvalid(
                "Interface cannot be empty. Please enter a valid interface.".into(),
            ));
        }

        let Some((name, tag)) = s.split_once('.') else {
            return Ok(Self::new(s, None));
        };

        let vlan = tag
            .parse::<u16>()
            .ok()
            .filter(|tag| (1..=4094).contains(tag))
            .ok_or_else(|| ScanError::InputInvalid(format!("'{tag}' is not a valid VLAN ID")))?;

        if name.is_empty() {
            return Err(ScanError::InputInvalid(format!("'{s}' has no parent interface")));
        }

        Ok(Self::new(name, Some(vlan)))
    }
}

/// Finds the interface whose address lies inside `range`.
///
/// Wired interfaces win over anything else when several qualify.
pub fn detect_for_range(
    range: &ScanRange,
    interfaces: &[NetworkInterface],
) -> Option<InterfaceSelection> {
    let candidates: Vec<&NetworkInterface> = interfaces
        .iter()
        .filter(|iface| iface.is_scan_candidate())
        .filter(|iface| {
            iface
                .get_ipv4_nets()
                .iter()
                .any(|net| range.contains(net.ip().into()))
        })
        .collect();

    let best = candidates
        .iter()
        .find(|iface| is_wired(iface))
        .or_else(|| candidates.first())?;

    // Subinterface names carry the tag already.
    best.name.parse::<InterfaceSelection>().ok()
}

/// Parses operator input and checks the parent interface exists locally.
pub fn validate(input: &str, interfaces: &[NetworkInterface]) -> Result<InterfaceSelection, ScanError> {
    let selection: InterfaceSelection = input.parse()?;

    let exists = interfaces
        .iter()
        .any(|iface| iface.name == selection.name && !iface.is_loopback());

    if !exists {
        return Err(ScanError::InputInvalid(format!(
            "'{}' is not a valid network interface. Please enter a valid interface.",
            input.trim()
        )));
    }

    Ok(selection)
}

pub fn is_wired(interface: &NetworkInterface) -> bool {
    WIRED_PREFIXES
        .iter()
        .any(|prefix| interface.name.starts_with(prefix))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
