//! nmap XML output (`-oX`) of the topology scan.
//!
//! Only the parts the registry fuses are read: host status, addresses,
//! hostnames, ports with their service banner, and the best OS match. The
//! best match is the first `osmatch`, described by its first `osclass`.

use std::net::IpAddr;

use netsift_common::host::{OsGuess, PortRecord, ServiceInfo};
use pnet::util::MacAddr;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, warn};

use super::{Parsed, Skipped};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyHost {
    pub addr: IpAddr,
    pub status: String,
    pub mac: Option<MacAddr>,
    pub mac_vendor: Option<String>,
    pub hostnames: Vec<String>,
    pub ports: Vec<PortRecord>,
    pub os: Option<OsGuess>,
}

impl TopologyHost {
    pub fn is_up(&self) -> bool {
        self.status.eq_ignore_ascii_case("up")
    }
}

#[derive(Default)]
struct HostBuilder {
    addr: Option<IpAddr>,
    status: String,
    mac: Option<MacAddr>,
    mac_vendor: Option<String>,
    hostnames: Vec<String>,
    ports: Vec<PortRecord>,
    os: Option<OsGuess>,
    /// Set while inside the first `osmatch`.
    in_first_osmatch: bool,
    osmatch_seen: bool,
}

impl HostBuilder {
    fn build(self) -> Result<TopologyHost, String> {
        let addr = self.addr.ok_or("host entry without an IP address")?;
        Ok(TopologyHost {
            addr,
            status: self.status,
            mac: self.mac,
            mac_vendor: self.mac_vendor,
            hostnames: self.hostnames,
            ports: self.ports,
            os: self.os,
        })
    }
}

pub fn parse(xml: &str) -> Parsed<TopologyHost> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut parsed = Parsed::default();
    let mut host: Option<HostBuilder> = None;
    let mut port: Option<PortRecord> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => open(&e, false, &mut host, &mut port),
            Ok(Event::Empty(e)) => {
                open(&e, true, &mut host, &mut port);
                close(e.name().as_ref(), &mut host, &mut port, &mut parsed);
            }
            Ok(Event::End(e)) => close(e.name().as_ref(), &mut host, &mut port, &mut parsed),
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("Error parsing nmap XML at byte {}: {e}", reader.buffer_position());
                parsed.skipped.push(Skipped {
                    line: format!("byte {}", reader.buffer_position()),
                    reason: e.to_string(),
                });
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    parsed
}

fn open(e: &BytesStart, empty: bool, host: &mut Option<HostBuilder>, port: &mut Option<PortRecord>) {
    let name = e.name();
    if name.as_ref() == b"host" {
        *host = Some(HostBuilder::default());
        return;
    }
    let Some(current) = host.as_mut() else {
        return;
    };

    match name.as_ref() {
        b"status" => current.status = attr(e, b"state").unwrap_or_default(),
        b"address" => match attr(e, b"addrtype").as_deref() {
            Some("ipv4") | Some("ipv6") => {
                current.addr = attr(e, b"addr").and_then(|a| a.parse().ok());
            }
            Some("mac") => {
                current.mac = attr(e, b"addr").and_then(|a| a.parse().ok());
                current.mac_vendor = attr(e, b"vendor").filter(|v| !v.is_empty());
            }
            _ => {}
        },
        b"hostname" => {
            if let Some(name) = attr(e, b"name").filter(|n| !n.is_empty()) {
                current.hostnames.push(name);
            }
        }
        b"port" => {
            let number = attr(e, b"portid").and_then(|p| p.parse::<u16>().ok());
            let protocol = attr(e, b"protocol").unwrap_or_else(|| "tcp".into());
            *port = number.map(|n| PortRecord::new(&protocol, n, "unknown"));
        }
        b"state" => {
            if let (Some(port), Some(state)) = (port.as_mut(), attr(e, b"state")) {
                port.state = state;
            }
        }
        b"service" => {
            if let Some(port) = port.as_mut() {
                port.service = ServiceInfo {
                    name: attr(e, b"name").unwrap_or_default(),
                    product: attr(e, b"product").unwrap_or_default(),
                    version: attr(e, b"version").unwrap_or_default(),
                    extra_info: attr(e, b"extrainfo").unwrap_or_default(),
                };
            }
        }
        b"osmatch" if !current.osmatch_seen => {
            current.osmatch_seen = true;
            current.in_first_osmatch = !empty;
            current.os = Some(OsGuess {
                detail: attr(e, b"name").unwrap_or_default(),
                confidence: attr(e, b"accuracy")
                    .and_then(|a| a.parse::<u8>().ok())
                    .unwrap_or(0)
                    .min(100),
                ..OsGuess::default()
            });
        }
        b"osclass" if current.in_first_osmatch => {
            current.in_first_osmatch = false;
            if let Some(os) = current.os.as_mut() {
                os.vendor = attr(e, b"vendor").unwrap_or_default();
                os.family = attr(e, b"osfamily").unwrap_or_default();
                os.generation = attr(e, b"osgen").unwrap_or_default();
            }
        }
        _ => {}
    }
}

fn close(
    name: &[u8],
    host: &mut Option<HostBuilder>,
    port: &mut Option<PortRecord>,
    parsed: &mut Parsed<TopologyHost>,
) {
    match name {
        b"port" => {
            if let (Some(current), Some(port)) = (host.as_mut(), port.take()) {
                current.ports.push(port);
            }
        }
        b"osmatch" => {
            if let Some(current) = host.as_mut() {
                current.in_first_osmatch = false;
            }
        }
        b"host" => {
            let Some(done) = host.take() else {
                return;
            };
            match done.build() {
                Ok(record) => parsed.records.push(record),
                Err(reason) => {
                    debug!("Skipping nmap host entry: {reason}");
                    parsed.skipped.push(Skipped {
                        line: "<host>".into(),
                        reason,
                    });
                }
            }
        }
        _ => {}
    }
}

fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.to_string())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
