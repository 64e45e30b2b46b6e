//! Reverse lookup artifact: `<address>\t<name>` or
//! `<address>\tNo PTR Record`.

use std::net::IpAddr;

use anyhow::{Context, anyhow};

use super::{Parsed, parse_lines};

pub const NO_PTR_RECORD: &str = "No PTR Record";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReverseEntry {
    pub addr: IpAddr,
    pub hostname: Option<String>,
}

pub fn parse(raw: &str) -> Parsed<ReverseEntry> {
    parse_lines("reverse lookup", raw, parse_line)
}

/// Formats one artifact line. The trailing root dot resolvers print is dropped.
pub fn render_line(addr: IpAddr, hostname: Option<&str>) -> String {
    let name = hostname
        .map(|h| h.trim().trim_end_matches('.'))
        .filter(|h| !h.is_empty())
        .unwrap_or(NO_PTR_RECORD);
    format!("{addr}\t{name}")
}

fn parse_line(line: &str) -> anyhow::Result<Option<ReverseEntry>> {
    let (addr, name) = line
        .split_once('\t')
        .ok_or_else(|| anyhow!("missing tab separator"))?;
    let addr: IpAddr = addr.trim().parse().context("not an address")?;

    let name = name.trim().trim_end_matches('.');
    let hostname = match name {
        "" | NO_PTR_RECORD => None,
        _ => Some(name.to_string()),
    };

    Ok(Some(ReverseEntry { addr, hostname }))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
