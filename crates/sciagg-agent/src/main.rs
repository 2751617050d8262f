//! sciagg — scientific article aggregator.
//! Entry point for the command-line binary.

mod cli;
mod commands;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sciagg_common::logging::init_tracing;
use sciagg_common::AppConfig;
use sciagg_db::Database;
use tracing::info;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config_dir.as_deref()).context("loading configuration")?;
    init_tracing(&config.settings.logging)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config_dir = %config.config_dir.display(),
        "sciagg starting"
    );

    let db = Database::open(&config.settings.database.path)
        .await
        .with_context(|| format!("opening database {}", config.settings.database.path))?;
    let db = Arc::new(db);

    match cli.command {
        Command::Run(args)  => commands::run(&config, db, &args).await,
        Command::Serve(args) => commands::serve(Arc::new(config), db, &args).await,
        Command::Stats      => commands::stats(&config, db).await,
        Command::TestSources => commands::check_sources(&config).await,
    }
}
