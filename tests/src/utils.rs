use std::net::{Ipv4Addr, Ipv6Addr};

use pnet::datalink::{MacAddr, NetworkInterface};
use pnet::ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};

const UP: u32 = 69699;
const LOOPBACK: u32 = 65609;
const POINT_TO_POINT: u32 = 69841;

pub fn ni(name: &str, index: u32, mac: Option<MacAddr>, ips: &[IpNetwork], flags: u32) -> NetworkInterface {
    NetworkInterface {
        name: name.into(),
        description: "".into(),
        index,
        mac,
        ips: ips.to_vec(),
        flags,
    }
}

pub fn v4(a: u8, b: u8, c: u8, d: u8, p: u8) -> IpNetwork {
    IpNetwork::V4(Ipv4Network::new(Ipv4Addr::new(a, b, c, d), p).unwrap())
}

pub fn v6(s: &str, p: u8) -> IpNetwork {
    IpNetwork::V6(Ipv6Network::new(s.parse::<Ipv6Addr>().unwrap(), p).unwrap())
}

/*************************************************************
                  Mock interfaces for testing
**************************************************************/

pub fn iface_all() -> Vec<NetworkInterface> {
    vec![lo(), tun0(), wlan0(), enp9s0(), eth0(), eth0_100(), docker0(), veth1234()]
}

pub fn lo() -> NetworkInterface {
    ni(
        "lo",
        1,
        Some(MacAddr::new(0, 0, 0, 0, 0, 0)),
        &[v4(127, 0, 0, 1, 8), v6("::1", 128)],
        LOOPBACK,
    )
}

pub fn enp9s0() -> NetworkInterface {
    ni(
        "enp9s0",
        2,
        Some(MacAddr::new(0xa8, 0xa1, 0x59, 0x13, 0x41, 0x46)),
        &[
            v4(10, 0, 0, 2, 24),
            v6("fe80::b3dd:5c39:7c29:48b6", 64),
        ],
        UP,
    )
}

pub fn eth0() -> NetworkInterface {
    ni(
        "eth0",
        6,
        Some(MacAddr::new(0x52, 0x54, 0x00, 0x12, 0x34, 0x56)),
        &[],
        UP,
    )
}

pub fn eth0_100() -> NetworkInterface {
    ni(
        "eth0.100",
        3,
        Some(MacAddr::new(0x52, 0x54, 0x00, 0x12, 0x34, 0x56)),
        &[v4(10, 1, 100, 5, 24)],
        UP,
    )
}

pub fn tun0() -> NetworkInterface {
    ni(
        "tun0",
        5,
        None,
        &[v4(10, 96, 0, 57, 16), v6("fe80::c137:8964:5a63:efde", 64)],
        POINT_TO_POINT,
    )
}

pub fn wlan0() -> NetworkInterface {
    ni(
        "wlan0",
        4,
        Some(MacAddr::new(0x34, 0xcf, 0xf6, 0x9a, 0x11, 0x22)),
        &[v4(10, 0, 0, 42, 24), v6("fe80::36cf:f6ff:fe9a:1122", 64)],
        UP,
    )
}

pub fn docker0() -> NetworkInterface {
    ni(
        "docker0",
        7,
        Some(MacAddr::new(0x02, 0x42, 0xac, 0x11, 0x00, 0x01)),
        &[v4(172, 17, 0, 1, 16)],
        UP,
    )
}

pub fn veth1234() -> NetworkInterface {
    ni(
        "veth1234",
        8,
        Some(MacAddr::new(0x1a, 0x2b, 0x3c, 0x4d, 0x5e, 0x6f)),
        &[v6("fe80::1a2b:3cff:fe4d:5e6f", 64)],
        UP,
    )
}
