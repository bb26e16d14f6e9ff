//! tm - tenant-migrate CLI

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::common::ExitCode;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    if let Err(err) = run(&cli).await {
        if let Some(ExitCode(code)) = err.downcast_ref::<ExitCode>() {
            std::process::exit(*code);
        }
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Plan(args) => commands::plan::execute(args, &cli.global).await,
        Commands::Generate(args) => commands::generate::execute(args, &cli.global).await,
        Commands::Apply(args) => commands::apply::execute(args, &cli.global).await,
        Commands::History(args) => commands::history::execute(args, &cli.global).await,
        Commands::ConnectionUrl(args) => {
            commands::connection_url::execute(args, &cli.global).await
        }
    }
}
