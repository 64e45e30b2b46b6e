use std::path::PathBuf;

use anyhow::bail;
use netsift_common::config::Config;
use netsift_core::pipeline::{self, SessionLayout};
use netsift_core::vendors::MacOuiRepo;
use tracing::info;

use crate::terminal::print;

/// Rebuilds the category files of a session from its scan artifacts.
pub async fn categorize(session_dir: PathBuf, cfg: &Config) -> anyhow::Result<()> {
    if !session_dir.is_dir() {
        bail!("{} is not a session directory", session_dir.display());
    }

    let layout = SessionLayout::new(session_dir);
    let registry = pipeline::recategorize(&layout, cfg, &MacOuiRepo).await?;
    if registry.is_empty() {
        print::header("zero hosts found");
        print::no_results();
        return Ok(());
    }

    let report = pipeline::write_categories(&layout, &registry).await?;
    info!("Host report written to {}", report.display());

    print::categorized(&pipeline::summarize(&layout, &registry));
    Ok(())
}
