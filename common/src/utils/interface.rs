use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::{IpNetwork, Ipv4Network};

pub trait NetworkInterfaceExtension {
    fn get_ipv4_nets(&self) -> Vec<Ipv4Network>;
    fn is_scan_candidate(&self) -> bool;
}

impl NetworkInterfaceExtension for NetworkInterface {
    fn get_ipv4_nets(&self) -> Vec<Ipv4Network> {
        self.ips
            .iter()
            .filter_map(|ip| {
                if let IpNetwork::V4(ipv4) = ip {
                    Some(*ipv4)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Up, not loopback and carrying at least one IPv4 network.
    fn is_scan_candidate(&self) -> bool {
        self.is_up() && !self.is_loopback() && !self.get_ipv4_nets().is_empty()
    }
}
