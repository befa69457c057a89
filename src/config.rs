use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

use crate::ledger::{AccountId, LedgerConfig, STATEMENT_SIZE};
use crate::persistence::schema::DEFAULT_ACCOUNTS;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    /// Per-query sqlx logging; off keeps `sqlx` at warn
    #[serde(default)]
    pub enable_tracing: bool,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ledger: LedgerSettings,
    #[serde(default)]
    pub accounts: AccountsConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Extra attempts for transient store failures (0 = no retry)
    #[serde(default)]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Upper bound on one request, body read and response included
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_max_body_bytes() -> usize {
    1024
}

fn default_retry_backoff_ms() -> u64 {
    50
}

fn default_request_timeout_ms() -> u64 {
    15_000
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL; `DATABASE_URL` overrides it
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime_secs: u64,
    pub acquire_timeout_ms: u64,
    pub connect_attempts: u32,
    pub connect_retry_delay_ms: u64,
    /// Create tables and provision accounts at startup
    pub init_schema: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            min_connections: 5,
            max_lifetime_secs: 300,
            acquire_timeout_ms: 5000,
            connect_attempts: 10,
            connect_retry_delay_ms: 2000,
            init_schema: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LedgerSettings {
    pub statement_size: usize,
    pub lock_timeout_ms: Option<u64>,
    pub operation_timeout_ms: Option<u64>,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            statement_size: STATEMENT_SIZE,
            lock_timeout_ms: None,
            operation_timeout_ms: None,
        }
    }
}

impl LedgerSettings {
    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_ms.map(Duration::from_millis)
    }

    pub fn engine_config(&self) -> LedgerConfig {
        LedgerConfig {
            statement_size: self.statement_size,
            operation_timeout: self.operation_timeout_ms.map(Duration::from_millis),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct AccountSeed {
    pub id: i32,
    pub limit: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AccountsConfig {
    /// Path ids outside `min_id..=max_id` never reach the engine
    pub min_id: i32,
    pub max_id: i32,
    pub seed: Vec<AccountSeed>,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            min_id: 1,
            max_id: 5,
            seed: DEFAULT_ACCOUNTS
                .iter()
                .map(|&(id, limit)| AccountSeed { id, limit })
                .collect(),
        }
    }
}

impl AccountsConfig {
    pub fn in_range(&self, id: AccountId) -> bool {
        (self.min_id..=self.max_id).contains(&id.id())
    }

    pub fn seeds(&self) -> impl Iterator<Item = (AccountId, i64)> + '_ {
        self.seed.iter().map(|s| (AccountId::new(s.id), s.limit))
    }
}

impl AppConfig {
    /// Load `config/{env}.yaml`, then apply environment overrides.
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config yaml: {}", config_path))?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// `DATABASE_URL` and `API_PORT` take precedence over the file.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DATABASE_URL").filter(|u| !u.is_empty()) {
            self.database.url = Some(url);
        }
        if let Some(port) = lookup("API_PORT").and_then(|p| p.parse().ok()) {
            self.gateway.port = port;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
log_level: info
log_dir: ./logs
log_file: ledger.log
use_json: false
rotation: daily
gateway:
  host: 0.0.0.0
  port: 9999
"#;

    #[test]
    fn test_defaults_from_minimal_yaml() {
        let config = AppConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.gateway.max_body_bytes, 1024);
        assert_eq!(config.gateway.retry_attempts, 0);
        assert_eq!(config.gateway.request_timeout(), Duration::from_secs(15));
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.database.connect_attempts, 10);
        assert_eq!(config.ledger.statement_size, 10);
        assert_eq!(config.accounts.seed.len(), 5);
        assert!(!config.enable_tracing);
    }

    #[test]
    fn test_nested_overrides() {
        let yaml = format!(
            "{MINIMAL}storage:\n  backend: memory\nledger:\n  lock_timeout_ms: 250\naccounts:\n  min_id: 1\n  max_id: 2\n  seed:\n    - {{ id: 1, limit: 10 }}\n    - {{ id: 2, limit: 20 }}\n"
        );
        let config = AppConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.ledger.lock_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.ledger.engine_config().operation_timeout, None);
        assert!(config.accounts.in_range(AccountId::new(2)));
        assert!(!config.accounts.in_range(AccountId::new(3)));
        assert!(!config.accounts.in_range(AccountId::new(0)));
        assert_eq!(
            config.accounts.seeds().collect::<Vec<_>>(),
            vec![(AccountId::new(1), 10), (AccountId::new(2), 20)]
        );
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::from_yaml(MINIMAL).unwrap();
        config.apply_env_overrides(|key| match key {
            "DATABASE_URL" => Some("postgres://ledger@db/ledger".to_string()),
            "API_PORT" => Some("8081".to_string()),
            _ => None,
        });
        assert_eq!(
            config.database.url.as_deref(),
            Some("postgres://ledger@db/ledger")
        );
        assert_eq!(config.gateway.port, 8081);

        // Unparsable port is ignored
        config.apply_env_overrides(|key| (key == "API_PORT").then(|| "http".to_string()));
        assert_eq!(config.gateway.port, 8081);
    }
}
