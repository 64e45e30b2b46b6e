use std::fs;

use netsift_common::host::Category;
use netsift_core::pipeline::{SessionState, StepOutcome};
use netsift_core::tools::Capability;

use crate::fakes::{FakeRunner, Harness, ScriptedSurface, categorized_addresses, unique};
use crate::utils::{enp9s0, iface_all, lo};

const ARP: &[&str] = &[
    "Interface: enp9s0, type: EN10MB, MAC: a8:a1:59:13:41:46, IPv4: 10.0.0.2",
    "Starting arp-scan 1.10.0 with 256 hosts (https://github.com/royhills/arp-scan)",
    "10.0.0.9\t3c:52:82:00:00:09\tHewlett Packard",
    "",
    "1 packets received by filter, 0 packets dropped by kernel",
    "Ending arp-scan 1.10.0: 256 hosts scanned in 1.9 seconds (134.74 hosts/sec). 1 responded",
];

const PING: &[&str] = &["10.0.0.5", "10.0.0.9", "10.0.0.20"];

const GREPABLE: &str = "# Nmap 7.94 scan initiated as: nmap -Pn -n -O --osscan-guess -p135,139,445\n\
Host: 10.0.0.5 (ws05.corp.local)\tStatus: Up\n\
Host: 10.0.0.5 (ws05.corp.local)\tPorts: 135/open/tcp//msrpc///, 139/open/tcp//netbios-ssn///, 445/open/tcp//microsoft-ds///\tOS: Microsoft Windows 10\n\
# Nmap done -- 3 IP addresses (3 hosts up) scanned in 12.01 seconds\n";

const TOPOLOGY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<nmaprun scanner="nmap" version="7.94">
<host><status state="up" reason="echo-reply"/>
<address addr="10.0.0.20" addrtype="ipv4"/>
<hostnames><hostname name="build01.corp.local" type="PTR"/></hostnames>
<ports>
<port protocol="tcp" portid="22"><state state="open"/><service name="ssh" product="OpenSSH" version="8.9p1"/></port>
</ports>
<os><osmatch name="Linux 5.0 - 5.4" accuracy="96"><osclass vendor="Linux" osfamily="Linux" osgen="5.X" accuracy="96"/></osmatch></os>
</host>
<host><status state="down" reason="no-response"/><address addr="10.0.0.99" addrtype="ipv4"/></host>
</nmaprun>
"#;

fn full_runner() -> FakeRunner {
    FakeRunner::new()
        .printing(Capability::AddressDiscovery, ARP)
        .printing(Capability::Reachability, PING)
        .resolving("10.0.0.5", "ws05.corp.local.")
        .writing(Capability::Fingerprint, GREPABLE)
        .writing(Capability::Topology, TOPOLOGY)
}

#[tokio::test]
async fn full_session_categorizes_every_host() {
    let surface = ScriptedSurface::new()
        .answer("10.0.0.0/24")
        .confirm(true)
        .answer("site-a")
        .confirm(true);
    let h = Harness::new(surface, full_runner(), vec![lo(), enp9s0()]);

    let report = h.pipeline.start().unwrap().await.unwrap();

    assert_eq!(report.state, SessionState::Completed);
    assert_eq!(report.results.len(), 7);
    assert!(
        report.results.iter().all(|r| matches!(r.outcome, StepOutcome::Succeeded(_))),
        "{:?}",
        report.results
    );

    let dir = h.session_dir("site-a");
    assert_eq!(report.session_dir.as_deref(), Some(dir.as_path()));

    let hosts_up = fs::read_to_string(dir.join("hosts_found_up.txt")).unwrap();
    assert_eq!(hosts_up.lines().collect::<Vec<_>>(), PING);

    let reverse = fs::read_to_string(dir.join("scans/dns-reverse.txt")).unwrap();
    assert!(reverse.contains("10.0.0.5\tws05.corp.local\n"), "{reverse}");
    assert!(reverse.contains("10.0.0.9\tNo PTR Record\n"), "{reverse}");

    let read = |category: Category| fs::read_to_string(dir.join(category.file_name())).unwrap();
    assert_eq!(read(Category::Printer), "10.0.0.9\n");
    assert_eq!(read(Category::WindowsUnknown), "10.0.0.5\n");
    assert_eq!(read(Category::Linux), "10.0.0.20\n");
    assert_eq!(read(Category::Unknown), "10.0.0.99\n");
    assert!(!dir.join(Category::Nas.file_name()).exists());

    let all = categorized_addresses(&dir);
    assert_eq!(all.len(), 4);
    assert_eq!(unique(&all).len(), 4);
    assert_eq!(report.hosts, 4);
    assert!(dir.join("hosts.json").is_file());

    let events = h.surface.events();
    let close = events
        .iter()
        .position(|e| e == "close:Scan Complete:All scans completed successfully.")
        .expect("output view closed with the success banner");
    let results = events.iter().position(|e| e == "results:4").expect("results shown");
    assert!(close < results);
    assert!(h.surface.has_event(
        "confirm:Detected Interface: enp9s0\nDetected VLAN ID: none\nDo you want to use these settings?"
    ));
    assert!(h.surface.has_event("input:Enter directory name for hostfiles:="));
    assert!(h.surface.has_event("line:$ arp-scan --interface=enp9s0 10.0.0.0/24"));

    let summary = h.surface.summary().unwrap();
    assert_eq!(summary.addresses(Category::Printer), vec!["10.0.0.9".parse::<std::net::IpAddr>().unwrap()]);
    assert!(!h.pipeline.is_busy());
}

#[tokio::test]
async fn declining_results_skips_the_results_view() {
    let surface = ScriptedSurface::new()
        .answer("10.0.0.0/24")
        .confirm(true)
        .answer("site-b")
        .confirm(false);
    let h = Harness::new(surface, full_runner(), vec![enp9s0()]);

    let report = h.pipeline.start().unwrap().await.unwrap();

    assert_eq!(report.state, SessionState::Completed);
    assert!(h.surface.has_event("confirm:Display categorized results?"));
    assert!(!h.surface.has_event("results:"));
}

#[tokio::test]
async fn manual_interface_entry_prefills_the_vlan_directory() {
    let surface = ScriptedSurface::new()
        .answer("10.1.100.0/24")
        .confirm(false)
        .answer("wlan9")
        .answer("eth0.100")
        .back_out();
    let h = Harness::new(surface, FakeRunner::new(), iface_all());

    let report = h.pipeline.start().unwrap().await.unwrap();

    assert_eq!(report.state, SessionState::Cancelled);
    assert!(report.results.is_empty());
    assert!(h.surface.has_event("confirm:Detected Interface: eth0\nDetected VLAN ID: 100\n"));
    assert!(h.surface.has_event("notice:Invalid Input:'wlan9' is not a valid network interface."));
    assert!(h.surface.has_event("input:Enter directory name for hostfiles:=vlan100"));
    assert!(h.runner.calls().is_empty());
    assert!(!h.workdir.path().join("Hostfiles").exists());
}

#[tokio::test]
async fn invalid_range_is_asked_again() {
    let surface = ScriptedSurface::new().answer("10.0.0.0").answer("").back_out();
    let h = Harness::new(surface, FakeRunner::new(), vec![enp9s0()]);

    let report = h.pipeline.start().unwrap().await.unwrap();

    assert_eq!(report.state, SessionState::Cancelled);
    let ranges = h
        .surface
        .events()
        .iter()
        .filter(|e| e.starts_with("input:Enter IP range"))
        .count();
    assert_eq!(ranges, 3);
    assert!(h.surface.has_event("notice:Invalid Input:'10.0.0.0' is not in CIDR notation"));
    assert!(h.surface.has_event("notice:Invalid Input:IP range cannot be empty"));
}

#[tokio::test]
async fn cancelling_during_the_sweep_stops_the_session() {
    let runner = FakeRunner::new()
        .printing(Capability::AddressDiscovery, ARP)
        .hanging(Capability::Reachability);
    let surface = ScriptedSurface::new()
        .answer("10.0.0.0/24")
        .confirm(true)
        .answer("site-c");
    let h = Harness::new(surface, runner, vec![enp9s0()]);

    let session = h.pipeline.start().unwrap();
    h.runner.started.notified().await;
    h.surface.cancel_output();
    let report = session.await.unwrap();

    assert_eq!(report.state, SessionState::Cancelled);
    let outcomes: Vec<_> = report.results.iter().map(|r| (r.name, r.outcome.clone())).collect();
    assert!(matches!(outcomes[0], ("ARP Scan", StepOutcome::Succeeded(_))));
    assert_eq!(outcomes[1], ("Ping Scan", StepOutcome::Cancelled));
    assert!(outcomes[2..].iter().all(|(_, o)| *o == StepOutcome::Skipped));

    assert!(!h.runner.ran(Capability::ReverseLookup));
    assert!(!h.runner.ran(Capability::Topology));

    let dir = h.session_dir("site-c");
    assert!(dir.join("scans/arp.txt").is_file());
    assert!(categorized_addresses(&dir).is_empty());
    assert!(!dir.join("hosts.json").exists());
    assert!(h.surface.has_event("close:Scan Canceled:Scan Canceled"));
    assert!(!h.surface.has_event("confirm:Display categorized results?"));
}
