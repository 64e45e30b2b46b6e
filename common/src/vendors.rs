use pnet::util::MacAddr;

/// Resolves the hardware vendor behind a MAC address.
pub trait VendorRepository: Send + Sync {
    fn get_vendor(&self, mac: MacAddr) -> Option<String>;
}
