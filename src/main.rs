mod agents;
mod artifact;
mod auth;
mod backend;
mod cli;
mod config;
mod error;
mod event;
mod normalize;
mod output;
mod pipeline;
mod text;
mod timing;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting storywriter");
    cli.execute().await?;

    Ok(())
}
