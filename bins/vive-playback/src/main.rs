mod cmd;
mod config;
mod error;

use clap::Parser;
use config::{Cli, Effective, Mode};

#[tokio::main]
async fn main() {
    // stdout занят эхом payload'ов, логи — в stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let eff = match Effective::new(cli.mode, &cli.args) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let result = match eff.mode {
        Mode::Record => cmd::record::run(&eff).await,
        Mode::Play => cmd::play::run(&eff).await,
    };
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
