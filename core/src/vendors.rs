use std::sync::OnceLock;

use mac_oui::Oui;
use netsift_common::vendors::VendorRepository;
use pnet::util::MacAddr;
use tracing::warn;

static OUI_DB: OnceLock<Option<Oui>> = OnceLock::new();

fn get_oui_db() -> Option<&'static Oui> {
    OUI_DB
        .get_or_init(|| match Oui::default() {
            Ok(db) => Some(db),
            Err(e) => {
                warn!("OUI database unavailable, vendor lookup disabled: {e:?}");
                None
            }
        })
        .as_ref()
}

/// Vendor lookup backed by the bundled IEEE OUI database.
pub struct MacOuiRepo;

impl VendorRepository for MacOuiRepo {
    fn get_vendor(&self, mac: MacAddr) -> Option<String> {
        let db = get_oui_db()?;
        match db.lookup_by_mac(&mac.to_string()) {
            Ok(Some(entry)) => Some(entry.company_name.clone()),
            _ => None,
        }
    }
}
