//! # Application Configuration
//!
//! Where the database lives and which fiscal settings the rules use.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     NCF_DB_PATH=/var/lib/ncf/ncf.db                                    │
//! │     NCF_RNC_RULE=type_flag_or_strict_codes                             │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/ncf/ncf.toml (Linux)                                     │
//! │     ~/Library/Application Support/do.ncf.ncf/ncf.toml (macOS)          │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     B01 / B02, ITBIS 18%, RncRule::TypeFlag                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # ncf.toml
//! [database]
//! path = "/var/lib/ncf/ncf.db"
//! max_connections = 5
//!
//! [fiscal]
//! credit_type_code = "B01"
//! consumer_type_code = "B02"
//! itbis_standard_rate_bps = 1800
//! rnc_rule = "type_flag"
//! ```

use ncf_core::validation::{validate_tax_rate_bps, validate_type_code};
use ncf_core::FiscalSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;

/// Environment variable overriding the database path.
pub const ENV_DB_PATH: &str = "NCF_DB_PATH";
/// Environment variable overriding the credit fiscal type code.
pub const ENV_CREDIT_TYPE: &str = "NCF_CREDIT_TYPE";
/// Environment variable overriding the final consumer type code.
pub const ENV_CONSUMER_TYPE: &str = "NCF_CONSUMER_TYPE";
/// Environment variable overriding the standard ITBIS rate (basis points).
pub const ENV_ITBIS_RATE_BPS: &str = "NCF_ITBIS_RATE_BPS";
/// Environment variable overriding the RNC rule.
pub const ENV_RNC_RULE: &str = "NCF_RNC_RULE";

// =============================================================================
// Database Settings
// =============================================================================

/// Where and how to open the SQLite database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file. Defaults to `ncf.db` in the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub fiscal: FiscalSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (ncf.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> DbResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| DbError::ConfigLoadFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DbResult<()> {
        let fiscal = &self.fiscal;

        validate_type_code(&fiscal.credit_type_code)
            .map_err(|e| DbError::InvalidConfig(format!("credit_type_code: {}", e)))?;
        validate_type_code(&fiscal.consumer_type_code)
            .map_err(|e| DbError::InvalidConfig(format!("consumer_type_code: {}", e)))?;

        if fiscal.credit_type_code == fiscal.consumer_type_code {
            return Err(DbError::InvalidConfig(
                "credit_type_code and consumer_type_code must differ".into(),
            ));
        }

        for code in &fiscal.strict_rnc_codes {
            validate_type_code(code)
                .map_err(|e| DbError::InvalidConfig(format!("strict_rnc_codes: {}", e)))?;
        }

        validate_tax_rate_bps(fiscal.itbis_standard_rate_bps)
            .map_err(|e| DbError::InvalidConfig(e.to_string()))?;

        if self.database.max_connections == 0 {
            return Err(DbError::InvalidConfig(
                "max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup (the environment in production).
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(ENV_DB_PATH) {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(code) = lookup(ENV_CREDIT_TYPE) {
            self.fiscal.credit_type_code = code.trim().to_uppercase();
        }

        if let Some(code) = lookup(ENV_CONSUMER_TYPE) {
            self.fiscal.consumer_type_code = code.trim().to_uppercase();
        }

        if let Some(rate) = lookup(ENV_ITBIS_RATE_BPS) {
            match rate.parse::<u32>() {
                Ok(bps) => self.fiscal.itbis_standard_rate_bps = bps,
                Err(_) => warn!(rate = %rate, "Ignoring non-numeric ITBIS rate in environment"),
            }
        }

        if let Some(rule) = lookup(ENV_RNC_RULE) {
            match rule.parse() {
                Ok(parsed) => {
                    debug!(rule = %rule, "Overriding RNC rule from environment");
                    self.fiscal.rnc_rule = parsed;
                }
                Err(e) => warn!("{}", e),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("do", "ncf", "ncf")
            .map(|dirs| dirs.config_dir().join("ncf.toml"))
    }

    /// Returns the default database path.
    pub fn default_database_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("do", "ncf", "ncf")
            .map(|dirs| dirs.data_dir().join("ncf.db"))
    }

    /// Builds the database configuration this config describes.
    pub fn db_config(&self) -> DbResult<DbConfig> {
        let path = self
            .database
            .path
            .clone()
            .or_else(Self::default_database_path)
            .ok_or_else(|| DbError::InvalidConfig("No database path available".into()))?;

        Ok(DbConfig::new(path)
            .max_connections(self.database.max_connections)
            .fiscal(self.fiscal.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncf_core::RncRule;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fiscal.credit_type_code, "B01");
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_toml_partial_file() {
        let config: AppConfig = toml::from_str(
            r#"
            [database]
            path = "/tmp/ncf-test.db"

            [fiscal]
            rnc_rule = "type_flag_or_strict_codes"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, Some(PathBuf::from("/tmp/ncf-test.db")));
        assert_eq!(config.fiscal.rnc_rule, RncRule::TypeFlagOrStrictCodes);
        assert_eq!(config.fiscal.consumer_type_code, "B02");
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_DB_PATH, "/data/ncf.db"),
            (ENV_CONSUMER_TYPE, "b32"),
            (ENV_ITBIS_RATE_BPS, "1600"),
            (ENV_RNC_RULE, "strict"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, Some(PathBuf::from("/data/ncf.db")));
        assert_eq!(config.fiscal.consumer_type_code, "B32");
        assert_eq!(config.fiscal.itbis_standard_rate_bps, 1600);
        assert_eq!(config.fiscal.rnc_rule, RncRule::TypeFlagOrStrictCodes);
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| match key {
            ENV_ITBIS_RATE_BPS => Some("eighteen".to_string()),
            ENV_RNC_RULE => Some("nonsense".to_string()),
            _ => None,
        });

        assert_eq!(config.fiscal.itbis_standard_rate_bps, 1800);
        assert_eq!(config.fiscal.rnc_rule, RncRule::TypeFlag);
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.fiscal.consumer_type_code = "B01".to_string();
        assert!(matches!(config.validate(), Err(DbError::InvalidConfig(_))));

        let mut config = AppConfig::default();
        config.fiscal.credit_type_code = "credit".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_db_config_carries_fiscal_settings() {
        let mut config = AppConfig::default();
        config.database.path = Some(PathBuf::from("/tmp/ncf.db"));
        config.fiscal.rnc_rule = RncRule::TypeFlagOrStrictCodes;

        let db_config = config.db_config().unwrap();
        assert_eq!(db_config.database_path, PathBuf::from("/tmp/ncf.db"));
        assert_eq!(db_config.fiscal.rnc_rule, RncRule::TypeFlagOrStrictCodes);
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!("ncf-{}.toml", uuid::Uuid::new_v4()));

        let mut config = AppConfig::default();
        config.fiscal.strict_rnc_codes = vec!["B01".to_string(), "B15".to_string()];
        config.save(Some(path.clone())).unwrap();

        let loaded = AppConfig::load_or_default(Some(path.clone()));
        assert_eq!(loaded.fiscal.strict_rnc_codes, vec!["B01", "B15"]);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).unwrap();
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[fiscal]"));
    }
}
