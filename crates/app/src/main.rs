use std::sync::Arc;

use clap::Parser;
use engine::{DirectoryUploader, Engine};
use migration::{Migrator, MigratorTrait};
use settings::Database;

mod cli;
mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = cli::Cli::parse();
    let settings = settings::Settings::new(args.config.as_deref())?;

    // stdout carries the JSON responses, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "tally={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let db = parse_database(&settings.database).await?;
    let mut builder = Engine::builder().database(db);
    if let Some(uploads) = &settings.uploads {
        tracing::info!("storing images under {}", uploads.directory);
        builder = builder.uploader(Arc::new(DirectoryUploader::new(&uploads.directory)));
    }
    if let Some(attempts) = settings.engine.max_write_attempts {
        builder = builder.max_write_attempts(attempts);
    }
    let engine = builder.build()?;

    if !cli::run(&engine, args.command).await? {
        std::process::exit(1);
    }
    Ok(())
}

async fn parse_database(
    config: &Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
