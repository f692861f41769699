mod args;
mod commands;
mod logging;

use args::{Cli, Command};
use clap::Parser;
use commands::GenerateArgs;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    match cli.command {
        Command::Init { force } => commands::init(&cli.root, force).await,
        Command::Generate {
            name,
            description,
            offline,
            json,
            owner,
        } => {
            commands::generate(
                &cli.root,
                GenerateArgs {
                    name,
                    description,
                    offline,
                    json,
                    owner,
                },
            )
            .await
        }
        Command::History { json } => commands::history(&cli.root, json).await,
    }
}
