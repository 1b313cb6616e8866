//! tessera CLI library

pub mod commands;
pub mod config;
pub mod error;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};

/// tessera - compose workload cluster manifests
#[derive(Parser, Debug)]
#[command(name = "tessera")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render manifests for new resources
    Template(commands::template::TemplateArgs),
    /// Read resources from the management cluster
    Get(commands::get::GetArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Template(args) => commands::template::run(args).await,
            Commands::Get(args) => commands::get::run(args).await,
        }
    }
}
