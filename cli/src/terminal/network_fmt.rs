use colored::*;
use netsift_common::network::interface::is_wired;
use netsift_common::utils::interface::NetworkInterfaceExtension;
use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::IpNetwork;

use crate::terminal::{colors, print};

pub fn to_key_value_pair_net(ip_net: &[IpNetwork]) -> Vec<(String, ColoredString)> {
    ip_net
        .iter()
        .map(|ip_network| match ip_network {
            IpNetwork::V4(ipv4_network) => {
                let address: ColoredString = ipv4_network.ip().to_string().color(colors::IPV4_ADDR);
                let prefix: ColoredString =
                    ipv4_network.prefix().to_string().color(colors::IPV4_PREFIX);
                ("IPv4".to_string(), format!("{address}/{prefix}").color(colors::SEPARATOR))
            }
            IpNetwork::V6(ipv6_network) => {
                let address: ColoredString = ipv6_network.ip().to_string().color(colors::IPV6_ADDR);
                let prefix: ColoredString =
                    ipv6_network.prefix().to_string().color(colors::IPV6_PREFIX);
                ("IPv6".to_string(), format!("{address}/{prefix}").color(colors::SEPARATOR))
            }
        })
        .collect()
}

pub fn print_interface(interface: &NetworkInterface, idx: usize) {
    print::tree_head(idx, &interface.name);
    let mut key_value_pair: Vec<(String, ColoredString)> = to_key_value_pair_net(&interface.ips);
    if let Some(mac_addr) = interface.mac {
        key_value_pair.push((
            "MAC".to_string(),
            mac_addr.to_string().color(colors::MAC_ADDR),
        ));
    }

    let link = if is_wired(interface) { "wired" } else { "other" };
    let role: ColoredString = if interface.is_scan_candidate() {
        format!("{link}, scan candidate").green()
    } else {
        format!("{link}, not scannable").bright_black()
    };
    key_value_pair.push(("Role".to_string(), role));

    print::as_tree_one_level(key_value_pair);
}
