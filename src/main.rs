//! Faena CLI — declarative task automation.

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "faena",
    version,
    about = "Declarative task automation — ordered instruction sets, step references, rollback"
)]
struct Cli {
    #[command(subcommand)]
    command: faena::cli::Commands,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if let Err(e) = faena::cli::dispatch(cli.command) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
