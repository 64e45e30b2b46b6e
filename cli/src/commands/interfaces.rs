use netsift_common::system::SystemRepository;
use netsift_core::system::SystemRepo;

use crate::mprint;
use crate::terminal::network_fmt;

pub fn interfaces() -> anyhow::Result<()> {
    let interfaces = SystemRepo.get_network_interfaces()?;
    for (idx, interface) in interfaces.iter().enumerate() {
        network_fmt::print_interface(interface, idx);
        if idx + 1 != interfaces.len() {
            mprint!();
        }
    }
    Ok(())
}
