//! Rave CLI entry point.

use clap::Parser;

use rave::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ask(args) => rave::cli::commands::ask::execute(args, cli.json).await,
        Commands::Config(args) => rave::cli::commands::config::execute(args, cli.json).await,
        Commands::Models => rave::cli::commands::models::execute(cli.json).await,
    };

    if let Err(err) = result {
        rave::cli::handle_error(err, cli.json);
    }
}
