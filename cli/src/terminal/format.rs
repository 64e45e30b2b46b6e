use std::net::IpAddr;

use colored::*;
use netsift_common::host::HostRecord;
use netsift_core::surface::{StyledLine, Tone};

use crate::terminal::colors;

pub fn ip(addr: &IpAddr) -> ColoredString {
    match addr {
        IpAddr::V4(v4) => v4.to_string().color(colors::IPV4_ADDR),
        IpAddr::V6(v6) => v6.to_string().color(colors::IPV6_ADDR),
    }
}

/// `addr  hostname  [vendor]  (os)`, leaving out whatever is unknown.
pub fn host_line(host: &HostRecord) -> String {
    let mut line = format!("{:<15}", ip(&host.addr));

    if let Some(name) = host.hostnames.iter().next() {
        line.push_str(&format!(" {}", name.color(colors::TEXT_DEFAULT)));
    }
    if let Some(vendor) = &host.mac_vendor {
        line.push_str(&format!(" {}", format!("[{vendor}]").color(colors::MAC_ADDR)));
    }
    if let Some(os) = host.os.as_ref().filter(|os| !os.detail.is_empty()) {
        line.push_str(&format!(" {}", format!("({})", os.detail).bright_black()));
    }
    line
}

pub fn styled_line(line: &StyledLine) -> String {
    let text: ColoredString = match line.tone {
        Tone::Plain => line.text.normal(),
        Tone::Info => line.text.bright_blue(),
        Tone::Success => line.text.bright_green(),
        Tone::Warning => line.text.yellow(),
        Tone::Error => line.text.bright_red(),
    };
    format!("{text}")
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
