//! mrshim CLI: resolve @mapper/@reducer Go structs into Hadoop shim descriptors.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "mrshim",
    version,
    about = "Resolve @mapper/@reducer Go structs into typed Hadoop MapReduce shim descriptors"
)]
struct Cli {
    /// Config file (default: ./mrshim.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: mrshim::cli::Commands,
}

fn main() {
    let cli = Cli::parse();
    mrshim::logging::init(cli.verbose);
    let result = mrshim::config::Settings::load(cli.config.as_deref())
        .and_then(|settings| mrshim::cli::dispatch(cli.command, settings));
    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
