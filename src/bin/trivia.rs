use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use secrecy::ExposeSecret;
use trivia_api::config::Settings;
use trivia_api::db::{self, SqliteStore};
use trivia_api::server::app::{run_server, AppState};
use trivia_api::telemetry::init_tracing;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file, `trivia.toml` in the working directory by default
    #[clap(long)]
    config: Option<PathBuf>,
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

    tracing::info!("Running db migrations...");
    db::run_migrations(&pool).await?;

    let state = AppState::new(Arc::new(SqliteStore::new(pool)));
    run_server(&settings.server, state).await
}
