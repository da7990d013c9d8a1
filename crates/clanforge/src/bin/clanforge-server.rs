//! Runs a Clanforge server.
//!
//! ```text
//! clanforge-server --config server.json --bind 0.0.0.0:8888 --clan-file clans.json
//! ```
//!
//! Flags override the config file, which overrides the defaults. Log
//! verbosity follows `RUST_LOG` (default `info`).

use std::path::PathBuf;

use clanforge::prelude::*;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "clanforge-server", version, about = "Clan strategy game server")]
struct Args {
    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long)]
    bind: Option<String>,

    /// Where to persist the clan table.
    #[arg(long)]
    clan_file: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<ServerConfig, ClanforgeError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(path) = self.clan_file {
            config.clan_file = Some(path);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), ClanforgeError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Args::parse().into_config()?;
    ClanforgeServer::builder().config(config).build().await?.run().await
}
