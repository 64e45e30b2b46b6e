//! # Host Registry
//!
//! Fuses the records every capability produced about the same address into
//! a single [`HostRecord`]. The registry is keyed by address, so there is
//! never more than one record per host.
//!
//! The set of known addresses is the union of every artifact: any address a
//! tool mentions is observed, even if nothing else is known about it.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::net::IpAddr;
use std::path::Path;

use netsift_common::error::ScanError;
use netsift_common::host::{Category, HostRecord, OsGuess};
use netsift_common::vendors::VendorRepository;
use tracing::{debug, info};

use crate::categorize::Categorizer;
use crate::parsers::arp::ArpEntry;
use crate::parsers::grepable::FingerprintEntry;
use crate::parsers::nmap_xml::TopologyHost;
use crate::parsers::reverse::ReverseEntry;
use crate::parsers::{self, Parsed};
use crate::pipeline::SessionLayout;

#[derive(Debug, Default, Clone)]
pub struct HostRegistry {
    hosts: BTreeMap<IpAddr, HostRecord>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a registry from the artifacts of a session directory.
    ///
    /// Missing artifacts are skipped; a session may have stopped early or a
    /// non-critical step may have failed.
    pub async fn from_artifacts(layout: &SessionLayout) -> Result<Self, ScanError> {
        let mut registry = Self::new();

        if let Some(raw) = read_artifact(&layout.arp()).await? {
            registry.merge_arp(&report(parsers::arp::parse(&raw), "arp"));
        }
        if let Some(raw) = read_artifact(&layout.ping()).await? {
            registry.merge_reachability(&report(parsers::reachability::parse(&raw), "ping"));
        }
        if let Some(raw) = read_artifact(&layout.reverse()).await? {
            registry.merge_reverse(&report(parsers::reverse::parse(&raw), "dns-reverse"));
        }
        if let Some(raw) = read_artifact(&layout.fingerprint()).await? {
            registry.merge_fingerprint(&report(parsers::grepable::parse(&raw), "os-discovery"));
        }
        if let Some(raw) = read_artifact(&layout.topology()).await? {
            registry.merge_topology(&report(parsers::nmap_xml::parse(&raw), "nmap"));
        }

        info!("Registry holds {} hosts", registry.len());
        Ok(registry)
    }

    /// The record for `addr`, created on first sight.
    pub fn observe(&mut self, addr: IpAddr) -> &mut HostRecord {
        self.hosts.entry(addr).or_insert_with(|| HostRecord::new(addr))
    }

    pub fn merge_arp(&mut self, entries: &[ArpEntry]) {
        for entry in entries {
            let record = self.observe(entry.addr);
            record.mac.get_or_insert(entry.mac);
            if record.mac_vendor.is_none() {
                record.mac_vendor = entry.vendor.clone();
            }
        }
    }

    pub fn merge_reachability(&mut self, addrs: &[IpAddr]) {
        for addr in addrs {
            self.observe(*addr);
        }
    }

    pub fn merge_reverse(&mut self, entries: &[ReverseEntry]) {
        for entry in entries {
            let record = self.observe(entry.addr);
            if let Some(name) = &entry.hostname {
                record.hostnames.insert(name.clone());
            }
        }
    }

    /// Grepable results carry no OS accuracy; their guess only fills a gap.
    pub fn merge_fingerprint(&mut self, entries: &[FingerprintEntry]) {
        for entry in entries {
            let record = self.observe(entry.addr);
            if let Some(name) = &entry.hostname {
                record.hostnames.insert(name.clone());
            }
            for port in &entry.ports {
                record.upsert_port(port.clone());
            }
            if record.os.is_none() {
                record.os = entry.os.as_ref().map(|detail| OsGuess {
                    detail: detail.clone(),
                    ..OsGuess::default()
                });
            }
        }
    }

    /// Hosts reported down are observed, but none of their details are used.
    pub fn merge_topology(&mut self, hosts: &[TopologyHost]) {
        for host in hosts {
            let record = self.observe(host.addr);
            if !host.is_up() {
                debug!("{} reported {} by the topology scan", host.addr, host.status);
                continue;
            }

            if let Some(mac) = host.mac {
                record.mac.get_or_insert(mac);
            }
            if record.mac_vendor.is_none() {
                record.mac_vendor = host.mac_vendor.clone();
            }
            record.hostnames.extend(host.hostnames.iter().cloned());
            for port in &host.ports {
                record.upsert_port(port.clone());
            }
            if host.os.is_some() {
                record.os = host.os.clone();
            }
        }
    }

    /// Fills missing vendor strings from the MAC address.
    pub fn enrich_vendors(&mut self, vendors: &dyn VendorRepository) {
        for record in self.hosts.values_mut() {
            if record.mac_vendor.is_some() {
                continue;
            }
            if let Some(vendor) = record.mac.and_then(|mac| vendors.get_vendor(mac)) {
                debug!("{} vendor resolved to {vendor}", record.addr);
                record.mac_vendor = Some(vendor);
            }
        }
    }

    /// Assigns every record its category.
    pub fn categorize(&mut self, categorizer: &Categorizer) {
        for record in self.hosts.values_mut() {
            record.category = categorizer.classify(record).category;
        }
    }

    /// Every record in exactly one group, groups in category order and
    /// records in address order. Empty categories are left out.
    pub fn partition(&self) -> BTreeMap<Category, Vec<&HostRecord>> {
        let mut groups: BTreeMap<Category, Vec<&HostRecord>> = BTreeMap::new();
        for record in self.hosts.values() {
            groups.entry(record.category).or_default().push(record);
        }
        groups
    }

    pub fn addresses(&self) -> Vec<IpAddr> {
        self.hosts.keys().copied().collect()
    }

    pub fn get(&self, addr: &IpAddr) -> Option<&HostRecord> {
        self.hosts.get(addr)
    }

    pub fn records(&self) -> impl Iterator<Item = &HostRecord> {
        self.hosts.values()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

async fn read_artifact(path: &Path) -> Result<Option<String>, ScanError> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{} not present, skipping", path.display());
            Ok(None)
        }
        Err(e) => Err(ScanError::io_at("read", path, e)),
    }
}

fn report<T>(parsed: Parsed<T>, artifact: &str) -> Vec<T> {
    if !parsed.skipped.is_empty() {
        debug!("{artifact}: skipped {} malformed entries", parsed.skipped.len());
    }
    parsed.records
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
