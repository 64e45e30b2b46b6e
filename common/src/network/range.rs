//! # Scan Range
//!
//! The operator supplies the address range in CIDR notation
//! (e.g. `192.168.1.0/24`). Host bits are cleared, so `10.0.0.7/24` and
//! `10.0.0.0/24` describe the same range.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use pnet::ipnetwork::Ipv4Network;

use crate::error::ScanError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScanRange {
    network: Ipv4Network,
}

impl ScanRange {
    pub fn new(ip: Ipv4Addr, prefix: u8) -> Result<Self, ScanError> {
        let net = Ipv4Network::new(ip, prefix)
            .map_err(|e| ScanError::InputInvalid(format!("invalid prefix /{prefix}: {e}")))?;
        let network = Ipv4Network::new(net.network(), prefix)
            .map_err(|e| ScanError::InputInvalid(e.to_string()))?;
        Ok(Self { network })
    }

    pub fn network(&self) -> Ipv4Network {
        self.network
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        match ip {
            IpAddr::V4(v4) => self.network.contains(v4),
            IpAddr::V6(_) => false,
        }
    }
}

impl FromStr for ScanRange {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ScanError::InputInvalid("IP range cannot be empty".into()));
        }

        let Some((ip_str, prefix_str)) = s.split_once('/') else {
            return Err(ScanError::InputInvalid(format!(
                "'{s}' is not in CIDR notation (e.g. 192.168.1.0/24)"
            )));
        };

        let ip = ip_str
            .parse::<Ipv4Addr>()
            .map_err(|e| ScanError::InputInvalid(format!("invalid IP in CIDR '{ip_str}': {e}")))?;

        let prefix = prefix_str.parse::<u8>().map_err(|e| {
            ScanError::InputInvalid(format!("invalid prefix in CIDR '{prefix_str}': {e}"))
        })?;

        Self::new(ip, prefix)
    }
}

impl fmt::Display for ScanRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network.network(), self.network.prefix())
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
