use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;
use trivia_api::config::Settings;
use trivia_api::db::{self, seed};
use trivia_api::telemetry::init_tracing;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file, `trivia.toml` in the working directory by default
    #[clap(long)]
    config: Option<PathBuf>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import categories.csv and questions.csv from a directory
    Import { path: PathBuf },
    /// Export categories.csv and questions.csv into a directory
    Export { path: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let pool = db::establish_connection(
        settings.database.url.expose_secret(),
        settings.database.max_connections,
    )
    .await
    .context("Cannot connect to DB")?;
    db::run_migrations(&pool).await?;

    match cli.command {
        Commands::Export { path } => seed::export_data(&pool, &path).await.context("Cannot export"),
        Commands::Import { path } => seed::import_data(&pool, &path).await.context("Cannot import"),
    }
}
