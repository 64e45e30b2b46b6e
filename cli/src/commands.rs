pub mod categorize;
pub mod interfaces;
pub mod scan;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "netsift")]
#[command(about = "Interactive network discovery and host categorization.")]
#[command(version)]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to the per-user config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory the hostfiles tree is created in
    #[arg(short, long, global = true)]
    pub workdir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Skip the startup banner
    #[arg(long, global = true)]
    pub no_banner: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run an interactive discovery scan
    #[command(alias = "s")]
    Scan,
    /// Re-categorize the hosts of an existing session directory
    #[command(alias = "c")]
    Categorize { session_dir: PathBuf },
    /// List the network interfaces of this machine
    #[command(alias = "i")]
    Interfaces,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
