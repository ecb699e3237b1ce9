//! Handles settings for the application.
//!
//! Values come from an optional `settings.toml` (or the file passed with
//! `--config`) and from `TALLY__`-prefixed environment variables, e.g.
//! `TALLY__APP__LEVEL=debug` or `TALLY__DATABASE__SQLITE=./tally.db`.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite("./tally.db".to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct Uploads {
    /// Directory receipt images are copied into.
    pub directory: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct EngineSettings {
    pub max_write_attempts: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    #[serde(default)]
    pub database: Database,
    pub uploads: Option<Uploads>,
    #[serde(default)]
    pub engine: EngineSettings,
}

impl Settings {
    pub fn new(path: Option<&str>) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("app.level", "info")?
            .add_source(File::with_name(path.unwrap_or("settings")).required(path.is_some()))
            .add_source(Environment::with_prefix("TALLY").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
