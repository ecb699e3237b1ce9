use sea_orm::Database;
use sea_orm_migration::prelude::*;

/// Same sqlite file the `tally` binary opens by default.
const DEFAULT_DB_PATH: &str = "./tally.db";

fn database_url() -> String {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        return url;
    }
    let path =
        std::env::var("TALLY__DATABASE__SQLITE").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
    format!("sqlite:{path}?mode=rwc")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut args = std::env::args().skip(1);
    let cmd = args.next().unwrap_or_else(|| "up".to_string());
    let steps = args.next().map(|steps| steps.parse::<u32>()).transpose()?;

    let db = Database::connect(database_url()).await?;

    match cmd.as_str() {
        "up" => migration::Migrator::up(&db, steps).await?,
        "down" => migration::Migrator::down(&db, steps.or(Some(1))).await?,
        "fresh" => migration::Migrator::fresh(&db).await?,
        "status" => migration::Migrator::status(&db).await?,
        _ => {
            eprintln!("Usage: migration [up [N]|down [N]|fresh|status]");
            std::process::exit(2);
        }
    }

    Ok(())
}
