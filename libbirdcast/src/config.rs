//! Configuration management for Birdcast

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{ConfigError, Result};
use crate::types::Account;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sent as User-Agent when fetching feeds, e.g. "Birdcast (contact@example.org)"
    pub user_agent: String,

    /// Where dedup state and raw feeds are kept; `~` is expanded
    #[serde(default)]
    pub cache_dir: Option<String>,

    pub server: ServerConfig,

    #[serde(default)]
    pub accounts: Vec<Account>,
}

/// The posting endpoint shared by all accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub instance: String,
    pub client_id: String,
    pub client_secret: String,
}

impl ServerConfig {
    /// Instance URL with an `https://` scheme added when none was given
    pub fn instance_url(&self) -> String {
        if self.instance.starts_with("http://") || self.instance.starts_with("https://") {
            self.instance.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", self.instance.trim_end_matches('/'))
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::MissingField("user_agent".to_string()).into());
        }
        if self.server.instance.trim().is_empty() {
            return Err(ConfigError::MissingField("server.instance".to_string()).into());
        }

        let mut names = HashSet::new();
        for (index, account) in self.accounts.iter().enumerate() {
            if account.name.trim().is_empty() {
                return Err(
                    ConfigError::MissingField(format!("accounts[{}].name", index)).into(),
                );
            }
            // Names become file names inside the cache directory
            if account.name.contains(['/', '\\']) || account.name.contains("..") {
                return Err(ConfigError::InvalidValue {
                    field: format!("accounts[{}].name", index),
                    reason: format!("'{}' must not contain '/', '\\' or '..'", account.name),
                }
                .into());
            }
            if account.feed_url.trim().is_empty() {
                return Err(
                    ConfigError::MissingField(format!("accounts[{}].feed_url", index)).into(),
                );
            }
            if let Err(e) = Url::parse(&account.feed_url) {
                return Err(ConfigError::InvalidValue {
                    field: format!("accounts[{}].feed_url", index),
                    reason: e.to_string(),
                }
                .into());
            }
            if !names.insert(account.name.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: format!("accounts[{}].name", index),
                    reason: format!("duplicate '{}'", account.name),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Resolved cache directory
    pub fn cache_path(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(PathBuf::from(shellexpand::tilde(dir).to_string())),
            None => {
                let cache_dir = dirs::cache_dir()
                    .ok_or_else(|| ConfigError::MissingField("cache directory".to_string()))?;
                Ok(cache_dir.join("birdcast"))
            }
        }
    }

    /// Look up an account by name, whether active or not
    pub fn account(&self, name: &str) -> Result<&Account> {
        self.accounts
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| ConfigError::AccountNotFound(name.to_string()).into())
    }

    /// Accounts to run, in configuration order.
    ///
    /// With a filter, exactly the named account runs even when inactive.
    /// Without one, every active account runs.
    pub fn select_accounts(&self, only: Option<&str>) -> Result<Vec<&Account>> {
        match only {
            Some(name) => Ok(vec![self.account(name)?]),
            None => Ok(self.accounts.iter().filter(|a| a.active).collect()),
        }
    }
}

/// Resolve the configuration file path (`BIRDCAST_CONFIG`, then the XDG config directory)
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("BIRDCAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("birdcast").join("config.toml"))
}
