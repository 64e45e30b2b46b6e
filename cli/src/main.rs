mod commands;
mod terminal;

use commands::{CommandLine, Commands, categorize, interfaces, scan};
use netsift_common::config::Config;
use terminal::{logging, print};
use tracing::warn;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init(commands.verbose);
    print::banner(commands.no_banner);

    let mut cfg = Config::load(commands.config.as_deref())?;
    if let Some(workdir) = commands.workdir {
        cfg.working_directory = workdir;
    }

    let result = match commands.command {
        Commands::Scan => {
            if !is_root::is_root() {
                warn!("Not running as root, ARP and OS discovery will likely fail");
            }
            print::header("discovery scan");
            scan::scan(cfg).await
        }
        Commands::Categorize { session_dir } => {
            print::header("categorizing session");
            categorize::categorize(session_dir, &cfg).await
        }
        Commands::Interfaces => {
            print::header("network interfaces");
            interfaces::interfaces()
        }
    };

    print::end_of_program();
    result
}
