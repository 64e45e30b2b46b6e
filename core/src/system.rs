use pnet::datalink::{self, NetworkInterface};

use netsift_common::system::SystemRepository;
use netsift_common::utils::interface::NetworkInterfaceExtension;

pub struct SystemRepo;

impl SystemRepository for SystemRepo {
    /// Scan candidates first (up, not loopback, with IPv4), then the rest,
    /// each group sorted by name.
    fn get_network_interfaces(&self) -> anyhow::Result<Vec<NetworkInterface>> {
        let mut interfaces = datalink::interfaces();
        interfaces.sort_by(|a, b| {
            b.is_scan_candidate()
                .cmp(&a.is_scan_candidate())
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(interfaces)
    }
}
