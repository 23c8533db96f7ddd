use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;

// Environment used when neither --env nor MAIL_FETCHER_ENV is given
pub const DEFAULT_ENVIRONMENT: &str = "development";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Account settings keyed by environment name
    #[serde(default)]
    pub environments: HashMap<String, AccountConfig>,
    pub consumer: Option<String>,
    pub save_dir: Option<String>,
    pub log_file: Option<String>,
    pub log_level: Option<String>,
    #[serde(default)]
    pub quiet: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[serde(alias = "pop3")]
    Pop,
    #[default]
    Imap,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Pop => write!(f, "pop"),
            Protocol::Imap => write!(f, "imap"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AccountConfig {
    pub server: String,
    pub port: Option<u16>,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub protocol: Protocol,
    pub use_tls: Option<bool>,
}

impl AccountConfig {
    pub fn use_tls(&self) -> bool {
        self.use_tls.unwrap_or(true)
    }

    /// Configured port, or the well-known one for the protocol
    pub fn port(&self) -> u16 {
        if let Some(port) = self.port {
            return port;
        }
        match (self.protocol, self.use_tls()) {
            (Protocol::Pop, true) => 995,
            (Protocol::Pop, false) => 110,
            (Protocol::Imap, true) => 993,
            (Protocol::Imap, false) => 143,
        }
    }
}

impl AppConfig {
    // Load config from defaults, then file (if exists), then environment variables
    pub fn new() -> Result<Self, ConfigError> {
        Self::configure_defaults()?
            .add_source(File::with_name("config").required(false))
            // e.g. MAIL_FETCHER_CONSUMER=save MAIL_FETCHER_SAVE_DIR=./inbox
            .add_source(Environment::with_prefix("MAIL_FETCHER").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn new_from_file(path: &str) -> Result<Self, ConfigError> {
        Self::configure_defaults()?
            .add_source(File::with_name(path).required(true))
            .add_source(Environment::with_prefix("MAIL_FETCHER").separator("__"))
            .build()?
            .try_deserialize()
    }

    fn configure_defaults()
    -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Ok(Config::builder())
    }

    /// Account settings for the named environment
    pub fn account(&self, environment: &str) -> Result<&AccountConfig, ConfigError> {
        self.environments.get(environment).ok_or_else(|| {
            ConfigError::NotFound(format!("environments.{}", environment))
        })
    }
}
