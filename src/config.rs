use std::path::Path;

use anyhow::Context;
use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize)]
pub struct DatabaseSettings {
    #[serde(deserialize_with = "deserialize_secret")]
    pub url: SecretString,
    pub max_connections: u32,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Settings {
    /// Defaults, then `trivia.toml` (or `path`), then `TRIVIA__*` variables.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("trivia").required(false),
        };

        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite:trivia.db")?
            .set_default("database.max_connections", 5)?
            .add_source(file)
            .add_source(
                Environment::with_prefix("TRIVIA")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }
}
