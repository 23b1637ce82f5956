//! # Server Configuration
//!
//! ## Sources (later wins)
//! 1. Defaults (this file)
//! 2. TOML file (`--config <path>`, `TALLY_CONFIG`, or `./tally.toml` if present)
//! 3. Environment variables (`TALLY_*`)
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [database]
//! path = "tally.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [ledger]
//! max_retries = 3
//! initial_backoff_ms = 50
//! max_backoff_ms = 1000
//!
//! [pricing]
//! tax_rate_bps = 1000
//!
//! [loyalty]
//! cents_per_point = 10000
//! points_per_coupon = 500
//! reward_percentage_bps = 500
//! reward_expiry_days = 30
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tally_core::{
    LoyaltyPolicy, PricingPolicy, Rate, DEFAULT_CENTS_PER_POINT, DEFAULT_POINTS_PER_COUPON,
    DEFAULT_REWARD_EXPIRY_DAYS, DEFAULT_REWARD_PERCENTAGE_BPS, DEFAULT_TAX_RATE_BPS,
    MAX_COUPON_EXPIRY_DAYS,
};
use tally_db::DbConfig;
use tally_ledger::{EngineConfig, RetryPolicy};

/// Config file picked up from the working directory when none is named.
pub const DEFAULT_CONFIG_FILE: &str = "tally.toml";

/// Database path that selects a private in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ledger: LedgerConfig,
    pub pricing: PricingConfig,
    pub loyalty: LoyaltyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file, or `:memory:`.
    pub path: PathBuf,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: PathBuf::from("tally.db"),
            max_connections: 5,
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Retries of an operation that lost a write race. 0 disables retrying.
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            max_retries: 3,
            initial_backoff_ms: 50,
            max_backoff_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub tax_rate_bps: u32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            tax_rate_bps: DEFAULT_TAX_RATE_BPS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoyaltyConfig {
    pub cents_per_point: i64,
    pub points_per_coupon: i64,
    pub reward_percentage_bps: u32,
    pub reward_expiry_days: i64,
}

impl Default for LoyaltyConfig {
    fn default() -> Self {
        LoyaltyConfig {
            cents_per_point: DEFAULT_CENTS_PER_POINT,
            points_per_coupon: DEFAULT_POINTS_PER_COUPON,
            reward_percentage_bps: DEFAULT_REWARD_PERCENTAGE_BPS,
            reward_expiry_days: DEFAULT_REWARD_EXPIRY_DAYS,
        }
    }
}

impl TallyConfig {
    /// Loads the file (if any), applies `TALLY_*` overrides and validates.
    ///
    /// With no explicit path, `./tally.toml` is read when it exists and
    /// defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => TallyConfig::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("TALLY_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("TALLY_PORT") {
            self.server.port = parse_var("TALLY_PORT", &port)?;
        }
        if let Some(path) = lookup("TALLY_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(max) = lookup("TALLY_DB_MAX_CONNECTIONS") {
            self.database.max_connections = parse_var("TALLY_DB_MAX_CONNECTIONS", &max)?;
        }
        if let Some(retries) = lookup("TALLY_LEDGER_MAX_RETRIES") {
            self.ledger.max_retries = parse_var("TALLY_LEDGER_MAX_RETRIES", &retries)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue("server.host".to_string()));
        }
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue("server.port".to_string()));
        }
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired("database.path".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue("database.max_connections".to_string()));
        }
        if self.database.busy_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue("database.busy_timeout_ms".to_string()));
        }
        if self.ledger.initial_backoff_ms > self.ledger.max_backoff_ms {
            return Err(ConfigError::InvalidValue("ledger.initial_backoff_ms".to_string()));
        }
        if self.pricing.tax_rate_bps > 10_000 {
            return Err(ConfigError::InvalidValue("pricing.tax_rate_bps".to_string()));
        }
        if self.loyalty.cents_per_point <= 0 {
            return Err(ConfigError::InvalidValue("loyalty.cents_per_point".to_string()));
        }
        if self.loyalty.points_per_coupon <= 0 {
            return Err(ConfigError::InvalidValue("loyalty.points_per_coupon".to_string()));
        }
        if !(1..=10_000).contains(&self.loyalty.reward_percentage_bps) {
            return Err(ConfigError::InvalidValue(
                "loyalty.reward_percentage_bps".to_string(),
            ));
        }
        if !(1..=MAX_COUPON_EXPIRY_DAYS).contains(&self.loyalty.reward_expiry_days) {
            return Err(ConfigError::InvalidValue("loyalty.reward_expiry_days".to_string()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn db_config(&self) -> DbConfig {
        let base = if self.database.path.as_os_str() == IN_MEMORY_PATH {
            DbConfig::in_memory()
        } else {
            DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
        };
        base.busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            pricing: PricingPolicy::new(Rate::from_bps(self.pricing.tax_rate_bps)),
            loyalty: LoyaltyPolicy {
                cents_per_point: self.loyalty.cents_per_point,
                points_per_coupon: self.loyalty.points_per_coupon,
                reward_rate: Rate::from_bps(self.loyalty.reward_percentage_bps),
                reward_expiry_days: self.loyalty.reward_expiry_days,
            },
            retry: RetryPolicy {
                max_retries: self.ledger.max_retries,
                initial_backoff: Duration::from_millis(self.ledger.initial_backoff_ms),
                max_backoff: Duration::from_millis(self.ledger.max_backoff_ms),
            },
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = TallyConfig::default();
        config.validate().unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");

        let engine = config.engine_config();
        assert_eq!(engine.pricing.tax_rate.bps(), 1000);
        assert_eq!(engine.loyalty, LoyaltyPolicy::default());
        assert_eq!(engine.retry, RetryPolicy::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = TallyConfig::from_toml(
            r#"
            [server]
            port = 9090

            [pricing]
            tax_rate_bps = 1700

            [loyalty]
            points_per_coupon = 1000
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.pricing.tax_rate_bps, 1700);
        assert_eq!(config.loyalty.points_per_coupon, 1000);
        assert_eq!(config.loyalty.cents_per_point, 10_000);
        assert_eq!(config.database, DatabaseConfig::default());
    }

    #[test]
    fn test_from_file_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.toml");
        std::fs::write(&path, "[database]\npath = \":memory:\"\n").unwrap();

        let config = TallyConfig::from_file(&path).unwrap();
        assert!(config.db_config().is_in_memory());

        let err = TallyConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let err = TallyConfig::from_toml("[server]\nport = \"eighty\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TALLY_HOST", "0.0.0.0"),
            ("TALLY_PORT", "3000"),
            ("TALLY_DATABASE_PATH", "/var/lib/tally/shop.db"),
            ("TALLY_DB_MAX_CONNECTIONS", "12"),
            ("TALLY_LEDGER_MAX_RETRIES", "0"),
        ]
        .into_iter()
        .collect();

        let mut config = TallyConfig::default();
        config
            .apply_env(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
        assert_eq!(config.database.path, PathBuf::from("/var/lib/tally/shop.db"));
        assert_eq!(config.database.max_connections, 12);
        assert_eq!(config.engine_config().retry.max_retries, 0);
    }

    #[test]
    fn test_unparseable_env_value_names_the_variable() {
        let mut config = TallyConfig::default();
        let err = config
            .apply_env(|key| (key == "TALLY_PORT").then(|| "http".to_string()))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for TALLY_PORT");
    }

    #[test]
    fn test_validation_rejects_nonsense() {
        let mut config = TallyConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = TallyConfig::default();
        config.ledger.initial_backoff_ms = 5_000;
        assert!(config.validate().is_err());

        let mut config = TallyConfig::default();
        config.loyalty.reward_percentage_bps = 0;
        assert!(config.validate().is_err());

        let mut config = TallyConfig::default();
        config.pricing.tax_rate_bps = 10_001;
        assert!(config.validate().is_err());
    }
}
