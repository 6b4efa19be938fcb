pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "fleetctl")]
#[command(about = "Fleet Dispatch CLI - operator tooling for the access gateway")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Print the role permission table")]
    Policy,

    #[command(about = "Mint a bearer token with the configured secret")]
    Token(commands::token::TokenArgs),

    #[command(about = "Query a running gateway")]
    Server {
        #[command(subcommand)]
        cmd: commands::server::ServerCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Policy => commands::policy::handle(output_format),
        Commands::Token(args) => commands::token::handle(args, output_format),
        Commands::Server { cmd } => commands::server::handle(cmd, output_format).await,
    }
}
