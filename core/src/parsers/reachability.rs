//! Reachability sweep output: one live address per line.

use std::net::IpAddr;

use anyhow::Context;

use super::{Parsed, parse_lines};

pub fn parse(raw: &str) -> Parsed<IpAddr> {
    parse_lines("reachability", raw, |line| {
        line.trim()
            .parse::<IpAddr>()
            .map(Some)
            .context("not an address")
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
