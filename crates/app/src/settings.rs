//! Handles settings for the application.
//!
//! Settings are read from an optional `settings.toml` in the working
//! directory, then overridden by `BEFRIEND__*` environment variables, e.g.
//! `BEFRIEND__SERVER__PORT=8080` or `BEFRIEND__DATABASE__SQLITE=./friends.db`.
//!
//! See `settings.example.toml` for the configuration.
use config::{Config, ConfigError, Environment, File};
use engine::RetryPolicy;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Database {
    #[default]
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: None,
            port: default_port(),
        }
    }
}

fn default_port() -> u16 {
    3000
}

/// Engine tuning; unset values keep the engine defaults.
#[derive(Debug, Default, Deserialize)]
pub struct Engine {
    pub search_page_size: Option<u64>,
    pub max_attempts: Option<usize>,
    pub base_backoff_ms: Option<u64>,
}

impl Engine {
    pub fn retry_policy(&self) -> RetryPolicy {
        let default = RetryPolicy::default();
        RetryPolicy {
            max_attempts: self.max_attempts.unwrap_or(default.max_attempts),
            base_backoff_ms: self.base_backoff_ms.unwrap_or(default.base_backoff_ms),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub database: Database,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub engine: Engine,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_config(
            Config::builder()
                .add_source(File::with_name("settings").required(false))
                .add_source(
                    Environment::with_prefix("BEFRIEND")
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    fn from_config(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn parse(toml: &str) -> Settings {
        Settings::from_config(
            Config::builder().add_source(File::from_str(toml, FileFormat::Toml)),
        )
        .unwrap()
    }

    #[test]
    fn empty_file_uses_defaults() {
        let settings = parse("");
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.database, Database::Memory);
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.engine.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn sections_override_defaults() {
        let settings = parse(
            r#"
            [app]
            level = "debug"

            [database]
            sqlite = "./friends.db"

            [server]
            bind = "0.0.0.0"
            port = 8080

            [engine]
            search_page_size = 50
            max_attempts = 2
            "#,
        );
        assert_eq!(settings.app.level, "debug");
        assert_eq!(settings.database, Database::Sqlite("./friends.db".to_string()));
        assert_eq!(settings.server.bind.as_deref(), Some("0.0.0.0"));
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.engine.search_page_size, Some(50));
        assert_eq!(settings.engine.retry_policy().max_attempts, 2);
        assert_eq!(settings.engine.retry_policy().base_backoff_ms, 120);
    }
}
