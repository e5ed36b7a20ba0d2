use anyhow::Result;
use clap::Parser;

use cannon::{
    app::{load_config, load_config_from},
    cli::{handle_command, Cli},
    utils::init_logger,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    init_logger(cli.verbose);

    // An explicit config file replaces the global and local ones
    let mut config = match &cli.config {
        Some(path) => load_config_from(std::slice::from_ref(path))?,
        None => load_config()?,
    };

    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }

    handle_command(&cli.command, config).await
}
