use pnet::datalink::NetworkInterface;

/// Read access to the local machine's networking state.
pub trait SystemRepository: Send + Sync {
    fn get_network_interfaces(&self) -> anyhow::Result<Vec<NetworkInterface>>;
}
