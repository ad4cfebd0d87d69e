use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "docqueue")]
#[command(about = "Contract document download and extraction queue", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $DOCQUEUE_CONFIG or config/docqueue.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API and worker pool
    Server(ServerArgs),
    /// Print queue status from the on-disk store
    Status,
    /// Requeue items left in `processing` by a previous run
    Reset,
    /// Print the effective configuration as TOML
    ShowConfig,
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to, overriding server.bind_addr
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_server_override() {
        let cli = Cli::parse_from(["docqueue", "server", "--address", "127.0.0.1:9000"]);
        match cli.command {
            Commands::Server(args) => {
                assert_eq!(args.address, Some("127.0.0.1:9000".parse().unwrap()))
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn parses_global_config_flag() {
        let cli = Cli::parse_from(["docqueue", "status", "--config", "/etc/docqueue.toml"]);
        assert!(matches!(cli.command, Commands::Status));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/docqueue.toml")));
    }
}
