mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use docqueue::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    docqueue::observability::init_tracing();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Server(args) => {
            if let Some(address) = args.address {
                config.server.bind_addr = address;
            }
            docqueue::api::run(config).await?
        }
        Commands::Status => commands::status(&config)?,
        Commands::Reset => commands::reset(&config).await?,
        Commands::ShowConfig => commands::show_config(&config)?,
    }

    Ok(())
}
