//! Configuration module
//!
//! Loaded from a TOML file (`~/.config/wvmc/config.toml` by default). Every
//! field has a default, so a missing or partial file still yields a usable
//! configuration. A handful of `WVMC_*` environment variables override the
//! file for container deployments.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Secret shipped in the default configuration. `validate` warns while it is in use.
pub const DEFAULT_TOKEN_SECRET: &str = "change-me-in-production";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Default config location: `~/.config/wvmc/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wvmc")
        .join("config.toml")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSection,
    pub security: SecurityConfig,
    pub scheduler: SchedulerConfig,
    pub hypervisor: HypervisorConfig,
    pub notifications: NotificationConfig,
    pub admin: AdminConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds to wait for in-flight work on shutdown.
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout: 30,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// sea-orm connection URL. `memory` selects the in-process store.
    pub url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: "sqlite://wvmc.db?mode=rwc".to_string(),
        }
    }
}

impl DatabaseSection {
    pub fn is_memory(&self) -> bool {
        self.url.eq_ignore_ascii_case("memory")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub token_secret: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    pub issuer: String,
    pub bcrypt_cost: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            token_secret: DEFAULT_TOKEN_SECRET.to_string(),
            access_ttl_secs: 60 * 60,
            refresh_ttl_secs: 30 * 24 * 60 * 60,
            issuer: "wvmc".to_string(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub refresh_interval_secs: u64,
    pub run_immediately: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 60,
            run_immediately: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HypervisorConfig {
    /// Hyper-V hosts queried by the inventory refresh.
    pub hosts: Vec<String>,
    /// Shell used to run instructions.
    pub program: String,
    /// Arguments placed before the instruction text.
    pub args: Vec<String>,
    pub inventory_script: String,
    /// Virtual switch machines are attached to on `start_network`.
    pub switch_name: String,
}

impl Default for HypervisorConfig {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            program: "pwsh".to_string(),
            args: ["-NoLogo", "-NoProfile", "-NonInteractive", "-Command"]
                .into_iter()
                .map(String::from)
                .collect(),
            inventory_script: "./powershell/GetVmForAdmins.ps1".to_string(),
            switch_name: "DMZ - Virtual Switch".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Base URL of the notification bot. Unset disables notifications.
    pub webhook_url: Option<String>,
    /// Upper bound for one webhook request
    pub timeout_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            email: "admin@wvmc.local".to_string(),
            name: "Administrator".to_string(),
            password: "admin123".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, then apply `WVMC_*` environment overrides.
    ///
    /// A missing file is not an error: defaults are used.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            Self::from_toml(&raw)?
        } else {
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Write the configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup("WVMC_TOKEN_SECRET") {
            self.security.token_secret = secret;
        }
        if let Some(ttl) = parse_var(&lookup, "WVMC_ACCESS_TTL_SECS") {
            self.security.access_ttl_secs = ttl;
        }
        if let Some(ttl) = parse_var(&lookup, "WVMC_REFRESH_TTL_SECS") {
            self.security.refresh_ttl_secs = ttl;
        }
        if let Some(interval) = parse_var(&lookup, "WVMC_REFRESH_INTERVAL_SECS") {
            self.scheduler.refresh_interval_secs = interval;
        }
        if let Some(hosts) = lookup("WVMC_HOSTS") {
            self.hypervisor.hosts = hosts
                .split(',')
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(url) = lookup("WVMC_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(url) = lookup("WVMC_WEBHOOK_URL") {
            self.notifications.webhook_url = Some(url).filter(|u| !u.trim().is_empty());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.token_secret.is_empty() {
            return Err(ConfigError::Invalid("security.token_secret is empty".into()));
        }
        if self.security.access_ttl_secs == 0 || self.security.refresh_ttl_secs == 0 {
            return Err(ConfigError::Invalid("token TTLs must be positive".into()));
        }
        if self.scheduler.refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.refresh_interval_secs must be positive".into(),
            ));
        }
        if self.notifications.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "notifications.timeout_secs must be positive".into(),
            ));
        }
        if !(4..=31).contains(&self.security.bcrypt_cost) {
            return Err(ConfigError::Invalid(
                "security.bcrypt_cost must be within 4..=31".into(),
            ));
        }
        if self.security.token_secret == DEFAULT_TOKEN_SECRET {
            warn!("⚠️ Using the default token secret; set security.token_secret");
        }
        if self.hypervisor.hosts.is_empty() {
            warn!("No hypervisor hosts configured; inventory will stay empty");
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparsable environment override");
            None
        }
    }
}
