//! `arp-scan` output: `<address> <mac> <vendor...>` per answering host,
//! framed by banner and summary lines.

use std::net::IpAddr;

use anyhow::{Context, anyhow};
use pnet::util::MacAddr;

use super::{Parsed, parse_lines};

const BANNERS: &[&str] = &["Interface:", "Starting arp-scan", "Ending arp-scan", "WARNING:"];
const UNKNOWN_VENDOR: &str = "(Unknown)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpEntry {
    pub addr: IpAddr,
    pub mac: MacAddr,
    pub vendor: Option<String>,
}

pub fn parse(raw: &str) -> Parsed<ArpEntry> {
    parse_lines("arp", raw, parse_line)
}

fn parse_line(line: &str) -> anyhow::Result<Option<ArpEntry>> {
    let trimmed = line.trim();
    if BANNERS.iter().any(|b| trimmed.starts_with(b)) || trimmed.contains("packets received") {
        return Ok(None);
    }

    let mut fields = trimmed.split_whitespace();
    let addr: IpAddr = fields
        .next()
        .ok_or_else(|| anyhow!("empty line"))?
        .parse()
        .context("first field is not an address")?;
    let mac: MacAddr = fields
        .next()
        .ok_or_else(|| anyhow!("missing MAC address"))?
        .parse()
        .map_err(|e| anyhow!("invalid MAC address: {e:?}"))?;

    let vendor = fields.collect::<Vec<_>>().join(" ");
    // Repeated replies are tagged "(DUP: n)".
    let vendor = match vendor.find("(DUP:") {
        Some(idx) => vendor[..idx].trim_end().to_string(),
        None => vendor,
    };
    let vendor = match vendor.as_str() {
        "" | UNKNOWN_VENDOR => None,
        _ => Some(vendor),
    };

    Ok(Some(ArpEntry { addr, mac, vendor }))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
