use netsift_common::error::ScanError;
use netsift_common::network::interface::{self, InterfaceSelection};
use netsift_common::network::range::ScanRange;
use pnet::datalink::NetworkInterface;

use crate::utils::{docker0, iface_all, lo, tun0, veth1234, wlan0};

fn detect(range: &str, interfaces: &[NetworkInterface]) -> Option<InterfaceSelection> {
    let range: ScanRange = range.parse().unwrap();
    interface::detect_for_range(&range, interfaces)
}

/*************************************************************
                       Detection
**************************************************************/

#[test]
fn wired_interface_wins_over_wireless() {
    assert_eq!(
        detect("10.0.0.0/24", &iface_all()),
        Some(InterfaceSelection::new("enp9s0", None))
    );
}

#[test]
fn wireless_is_used_when_nothing_else_matches() {
    let interfaces = vec![lo(), veth1234(), wlan0()];
    assert_eq!(
        detect("10.0.0.0/25", &interfaces),
        Some(InterfaceSelection::new("wlan0", None))
    );
}

#[test]
fn vlan_subinterface_carries_its_tag() {
    assert_eq!(
        detect("10.1.100.0/24", &iface_all()),
        Some(InterfaceSelection::new("eth0", Some(100)))
    );
}

#[test]
fn tunnel_and_bridge_addresses_are_matched_too() {
    assert_eq!(
        detect("10.96.0.0/16", &[tun0()]),
        Some(InterfaceSelection::new("tun0", None))
    );
    assert_eq!(
        detect("172.17.0.0/16", &[lo(), docker0()]),
        Some(InterfaceSelection::new("docker0", None))
    );
}

#[test]
fn nothing_detected_outside_local_networks() {
    assert_eq!(detect("192.168.50.0/24", &iface_all()), None);
    assert_eq!(detect("127.0.0.0/8", &iface_all()), None);
    assert_eq!(detect("10.0.0.0/24", &[]), None);
}

/*************************************************************
                       Manual entry
**************************************************************/

#[test]
fn manual_entry_requires_a_local_parent() {
    let interfaces = iface_all();

    assert_eq!(
        interface::validate("eth0.100", &interfaces).unwrap(),
        InterfaceSelection::new("eth0", Some(100))
    );
    assert_eq!(
        interface::validate(" wlan0 ", &interfaces).unwrap(),
        InterfaceSelection::new("wlan0", None)
    );

    for bad in ["wlan9", "lo", "eth0.5000", "eth0.abc", ""] {
        let err = interface::validate(bad, &interfaces).unwrap_err();
        assert!(matches!(err, ScanError::InputInvalid(_)), "{bad}: {err}");
    }
}
