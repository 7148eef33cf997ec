use std::path::PathBuf;

use anyhow::Result;
use config::{Config, ConfigBuilder, builder::DefaultState};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub vault: VaultConfig,
    pub auth: AuthConfig,
    pub access: AccessConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub max_connections: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VaultConfig {
    /// Directory every vault path is confined to. Created at startup if missing.
    pub root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub session_ttl_seconds: u64,
    pub session_purge_interval_seconds: u64,
    pub min_password_length: usize,
    pub allow_registration: bool,
    pub secure_cookie: bool,
    pub bootstrap_admin: Option<BootstrapAdminConfig>,
}

/// Administrator seeded at startup when the user table is empty.
#[derive(Clone, Deserialize)]
pub struct BootstrapAdminConfig {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdminConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    /// Also evaluate the same-actor branch of the access gate.
    pub legacy_same_actor: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub serve_origin: Option<String>,
}

impl ServerConfig {
    /// ## Summary
    /// Returns the server address as a string in the format "host:port".
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// ## Summary
    /// Returns the public origin used when building share URLs.
    #[must_use]
    pub fn origin(&self) -> String {
        if let Some(origin) = &self.serve_origin {
            origin.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", self.bind_addr())
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// ## Summary
    /// Returns a configuration builder holding every default value.
    ///
    /// ## Errors
    /// Returns an error if a default cannot be set.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 7000)?
            .set_default("database.backend", "postgres")?
            .set_default("database.max_connections", 4)?
            .set_default("vault.root", "files")?
            .set_default("auth.session_ttl_seconds", 7 * 24 * 60 * 60)?
            .set_default("auth.session_purge_interval_seconds", 15 * 60)?
            .set_default("auth.min_password_length", 8)?
            .set_default("auth.allow_registration", true)?
            .set_default("auth.secure_cookie", false)?
            .set_default("access.legacy_same_actor", false)?
            .set_default("logging.level", "debug")?)
    }

    /// ## Summary
    /// Loads configuration from defaults, environment variables and an optional
    /// `config.toml`. Environment variables use the `STRONGBOX_` prefix and `__`
    /// between sections, e.g. `STRONGBOX_AUTH__MIN_PASSWORD_LENGTH`.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Ok(Self::defaults()?
            .add_source(
                config::Environment::with_prefix("STRONGBOX")
                    .prefix_separator("_")
                    .separator("__")
                    .convert_case(config::Case::Snake)
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .add_source(config::File::with_name("config.toml").required(false))
            .build()?
            .try_deserialize::<Settings>()?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Failed to read .env file"),
    }

    Settings::load()
}
