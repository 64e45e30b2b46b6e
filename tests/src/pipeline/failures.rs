use netsift_common::error::ScanError;
use netsift_common::host::Category;
use netsift_core::pipeline::{SessionState, StepOutcome};
use netsift_core::tools::Capability;

use crate::fakes::{FakeRunner, Harness, ScriptedSurface, categorized_addresses};
use crate::utils::enp9s0;

const TOPOLOGY: &str = r#"<?xml version="1.0"?>
<nmaprun>
<host><status state="up"/><address addr="10.0.0.5" addrtype="ipv4"/></host>
</nmaprun>
"#;

fn scan_prompts(dir: &str) -> ScriptedSurface {
    ScriptedSurface::new()
        .answer("10.0.0.0/24")
        .confirm(true)
        .answer(dir)
}

#[tokio::test]
async fn critical_failure_halts_the_session() {
    let runner = FakeRunner::new().failing(
        Capability::AddressDiscovery,
        "You need to be root, or arp-scan must be SUID root",
    );
    let h = Harness::new(scan_prompts("arp-fail"), runner, vec![enp9s0()]);

    let report = h.pipeline.start().unwrap().await.unwrap();

    assert_eq!(report.state, SessionState::Failed("ARP Scan".into()));
    assert_eq!(
        report.results[0].outcome,
        StepOutcome::Failed("arp-scan failed: You need to be root, or arp-scan must be SUID root".into())
    );
    assert!(report.results[1..].iter().all(|r| r.outcome == StepOutcome::Skipped));
    assert_eq!(h.runner.calls(), vec![Capability::AddressDiscovery]);

    assert!(h.surface.has_event("line:You need to be root"));
    assert!(h.surface.has_event("close:Scan Failed:ARP Scan Failed"));
    assert!(h.surface.has_event("notice:Scan Failed:ARP Scan Failed: arp-scan failed: You need to be root"));
    assert!(categorized_addresses(&h.session_dir("arp-fail")).is_empty());
}

#[tokio::test]
async fn non_critical_failure_continues() {
    let runner = FakeRunner::new()
        .printing(Capability::Reachability, &["10.0.0.5"])
        .failing(Capability::Fingerprint, "QUITTING!")
        .writing(Capability::Topology, TOPOLOGY);
    let h = Harness::new(scan_prompts("fp-fail"), runner, vec![enp9s0()]);

    let report = h.pipeline.start().unwrap().await.unwrap();

    assert_eq!(report.state, SessionState::Completed);
    let fingerprint = report
        .results
        .iter()
        .find(|r| r.name == "Windows OS Discovery")
        .unwrap();
    assert_eq!(fingerprint.outcome, StepOutcome::Failed("nmap failed: QUITTING!".into()));
    assert!(h.runner.ran(Capability::Topology));
    assert!(h.surface.has_event("line:Windows OS Discovery failed: nmap failed: QUITTING!. Continuing."));
    assert!(h.surface.has_event("close:Scan Complete:All scans completed successfully."));

    let dir = h.session_dir("fp-fail");
    assert_eq!(
        std::fs::read_to_string(dir.join(Category::Unknown.file_name())).unwrap(),
        "10.0.0.5\n"
    );
}

#[tokio::test]
async fn no_live_hosts_fails_at_the_host_list() {
    let runner = FakeRunner::new().printing(
        Capability::AddressDiscovery,
        &["Interface: enp9s0, type: EN10MB, MAC: a8:a1:59:13:41:46, IPv4: 10.0.0.2"],
    );
    let h = Harness::new(scan_prompts("empty"), runner, vec![enp9s0()]);

    let report = h.pipeline.start().unwrap().await.unwrap();

    assert_eq!(report.state, SessionState::Failed("Create Hostfile".into()));
    let aggregate = report.results.iter().find(|r| r.name == "Create Hostfile").unwrap();
    assert_eq!(aggregate.outcome, StepOutcome::Failed(ScanError::EmptyHostList.to_string()));
    assert!(!h.runner.ran(Capability::Topology));
    assert!(!h.session_dir("empty").join("hosts_found_up.txt").exists());
}

#[tokio::test]
async fn second_session_is_rejected_while_one_runs() {
    let runner = FakeRunner::new().hanging(Capability::AddressDiscovery);
    let h = Harness::new(scan_prompts("busy"), runner, vec![enp9s0()]);

    let first = h.pipeline.start().unwrap();
    h.runner.started.notified().await;

    assert!(h.pipeline.is_busy());
    assert!(matches!(h.pipeline.start(), Err(ScanError::SessionActive)));

    h.surface.cancel_output();
    let report = first.await.unwrap();
    assert_eq!(report.state, SessionState::Cancelled);
    assert_eq!(report.results[0].outcome, StepOutcome::Cancelled);
    assert!(!h.pipeline.is_busy());

    // Out of scripted answers, so the next session backs out at once.
    let next = h.pipeline.start().unwrap().await.unwrap();
    assert_eq!(next.state, SessionState::Cancelled);
}

#[tokio::test]
async fn io_failure_halts_a_non_critical_step() {
    let runner = FakeRunner::new().printing(Capability::Reachability, &["10.0.0.5"]);
    let h = Harness::new(scan_prompts("io-fail"), runner, vec![enp9s0()]);
    let reverse = h.session_dir("io-fail").join("scans/dns-reverse.txt");
    h.runner.obstruct_on(Capability::Reachability, reverse);

    let report = h.pipeline.start().unwrap().await.unwrap();

    assert_eq!(report.state, SessionState::Failed("DNS Reverse Lookup".into()));
    let lookup = report
        .results
        .iter()
        .find(|r| r.name == "DNS Reverse Lookup")
        .unwrap();
    assert!(matches!(&lookup.outcome, StepOutcome::Failed(reason) if reason.contains("dns-reverse.txt")));
    assert!(report.results[3..].iter().all(|r| r.outcome == StepOutcome::Skipped));
    assert!(!h.runner.ran(Capability::Fingerprint));
    assert!(!h.runner.ran(Capability::Topology));
    assert!(h.surface.has_event("close:Scan Failed:DNS Reverse Lookup Failed"));
}

#[tokio::test]
async fn reused_directory_does_not_leak_the_previous_run() {
    let runner = FakeRunner::new()
        .printing(Capability::Reachability, &["10.0.0.5"])
        .failing(Capability::Fingerprint, "QUITTING!")
        .writing(Capability::Topology, TOPOLOGY);
    let h = Harness::new(scan_prompts("reuse"), runner, vec![enp9s0()]);

    let dir = h.session_dir("reuse");
    std::fs::create_dir_all(dir.join("scans")).unwrap();
    std::fs::write(
        dir.join("scans/os-discovery.txt"),
        "Host: 10.0.0.66 ()\tPorts: 139/open/tcp//netbios-ssn///, 445/open/tcp//microsoft-ds///\n",
    )
    .unwrap();
    std::fs::write(dir.join(Category::Printer.file_name()), "10.0.0.77\n").unwrap();

    let report = h.pipeline.start().unwrap().await.unwrap();

    assert_eq!(report.state, SessionState::Completed);
    assert!(!dir.join("scans/os-discovery.txt").exists());
    assert_eq!(categorized_addresses(&dir), vec!["10.0.0.5".to_string()]);
    assert!(!dir.join(Category::WindowsUnknown.file_name()).exists());
    assert!(!dir.join(Category::Printer.file_name()).exists());
    assert_eq!(report.hosts, 1);
}
