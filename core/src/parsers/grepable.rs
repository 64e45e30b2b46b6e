//! nmap grepable output (`-oG`).
//!
//! ```text
//! # Nmap 7.94 scan initiated ...
//! Host: 10.0.0.5 ()	Status: Up
//! Host: 10.0.0.5 ()	Ports: 139/open/tcp//netbios-ssn///, 445/open/tcp//microsoft-ds///	OS: Microsoft Windows 10
//! ```
//!
//! A host usually shows up on two lines, one for its status and one for its
//! ports; the registry merges them.

use std::net::IpAddr;

use anyhow::{Context, anyhow, bail};
use netsift_common::host::{PortRecord, ServiceInfo};

use super::{Parsed, parse_lines};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintEntry {
    pub addr: IpAddr,
    pub hostname: Option<String>,
    pub status: Option<String>,
    pub ports: Vec<PortRecord>,
    pub os: Option<String>,
}

pub fn parse(raw: &str) -> Parsed<FingerprintEntry> {
    parse_lines("fingerprint", raw, parse_line)
}

fn parse_line(line: &str) -> anyhow::Result<Option<FingerprintEntry>> {
    if line.starts_with('#') {
        return Ok(None);
    }

    let mut fields = line.split('\t');
    let host = fields
        .next()
        .and_then(|f| f.strip_prefix("Host: "))
        .ok_or_else(|| anyhow!("not a host line"))?;

    let (addr, hostname) = match host.split_once(' ') {
        Some((addr, rest)) => (addr, rest.trim().trim_start_matches('(').trim_end_matches(')')),
        None => (host, ""),
    };

    let mut entry = FingerprintEntry {
        addr: addr.parse().context("host field is not an address")?,
        hostname: (!hostname.is_empty()).then(|| hostname.to_string()),
        status: None,
        ports: Vec::new(),
        os: None,
    };

    for field in fields {
        let Some((key, value)) = field.split_once(": ") else {
            continue;
        };
        match key {
            "Status" => entry.status = Some(value.trim().to_string()),
            "Ports" => {
                for port in value.split(", ") {
                    entry.ports.push(parse_port(port)?);
                }
            }
            "OS" => entry.os = Some(value.trim().to_string()),
            _ => {}
        }
    }

    Ok(Some(entry))
}

/// `port/state/protocol/owner/service/rpc/version/`
fn parse_port(raw: &str) -> anyhow::Result<PortRecord> {
    let parts: Vec<&str> = raw.trim().split('/').collect();
    if parts.len() < 3 {
        bail!("truncated port entry {raw:?}");
    }

    let port: u16 = parts[0].parse().with_context(|| format!("bad port number {:?}", parts[0]))?;
    let service = ServiceInfo {
        name: parts.get(4).copied().unwrap_or_default().to_string(),
        product: parts.get(6).copied().unwrap_or_default().to_string(),
        ..ServiceInfo::default()
    };

    Ok(PortRecord::new(parts[2], port, parts[1]).with_service(service))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
