//! Smart Parking Edge Node - Main Entry Point

use clap::Parser;

use smartpark_core::api::{commands, Cli, Commands};
use smartpark_core::constants::{APP_NAME, APP_VERSION};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    log::debug!("Starting {} v{}", APP_NAME, APP_VERSION);

    let result = match &cli.command {
        Commands::Run(args) => commands::run(args).map(|_| ()),
        Commands::Validate(args) => commands::validate(args).map(|_| ()),
        Commands::Layout => commands::layout().map(|_| ()),
    };

    if let Err(e) = &result {
        log::error!("{:#}", e);
    }
    result
}
