//! settlechain CLI entry point.

use clap::Parser;
use logging::LogFormat;

mod commands;
mod config;
mod logging;

#[derive(Parser)]
#[command(name = "settlechain")]
#[command(about = "A settlement-validated proof-of-work ledger", long_about = None)]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, global = true, default_value = "pretty")]
    log_format: LogFormat,

    /// Log mining progress (same as RUST_LOG=info)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<commands::Commands>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose { "info" } else { "warn" };
    logging::init_logging(level, cli.log_format);

    match cli.command {
        Some(cmd) => {
            if let Err(e) = commands::run(cmd).await {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("settlechain - A settlement-validated proof-of-work ledger");
            println!("Run 'settlechain --help' for usage information.");
        }
    }
}
