// ⚙️ Config - runtime settings read from the environment
//
//   AGROREAL_DB_PATH        database file           (data/agroreal.db)
//   AGROREAL_BIND_ADDR      API listen address      (0.0.0.0:3000)
//   AGROREAL_LOCALE         money locale            (pt-BR)
//   AGROREAL_CURRENCY       ISO 4217 code           (BRL)
//   AGROREAL_RECENT_LIMIT   entries per card        (5)

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

use crate::currency::{CurrencyFormatter, FormatError, DEFAULT_CURRENCY, DEFAULT_LOCALE};

pub const DEFAULT_DB_PATH: &str = "data/agroreal.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_RECENT_LIMIT: u32 = 5;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error(transparent)]
    Format(#[from] FormatError),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub locale: String,
    pub currency: String,
    pub recent_limit: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys take their default
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_path = get("AGROREAL_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let locale = get("AGROREAL_LOCALE").unwrap_or_else(|| DEFAULT_LOCALE.to_string());
        let currency = get("AGROREAL_CURRENCY").unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let bind_addr = match get("AGROREAL_BIND_ADDR") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "AGROREAL_BIND_ADDR",
                value,
            })?,
            None => DEFAULT_BIND_ADDR
                .parse()
                .map_err(|_| ConfigError::Invalid {
                    key: "AGROREAL_BIND_ADDR",
                    value: DEFAULT_BIND_ADDR.to_string(),
                })?,
        };

        let recent_limit = match get("AGROREAL_RECENT_LIMIT") {
            Some(value) => match value.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "AGROREAL_RECENT_LIMIT",
                        value,
                    })
                }
            },
            None => DEFAULT_RECENT_LIMIT,
        };

        let config = Config {
            db_path: PathBuf::from(db_path.trim()),
            bind_addr,
            locale: locale.trim().to_string(),
            currency: currency.trim().to_string(),
            recent_limit,
        };

        // Fail at startup, not at the first render
        config.formatter()?;

        Ok(config)
    }

    pub fn formatter(&self) -> Result<CurrencyFormatter, FormatError> {
        CurrencyFormatter::new(&self.locale, &self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();

        assert_eq!(config.db_path, PathBuf::from("data/agroreal.db"));
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.locale, "pt-BR");
        assert_eq!(config.currency, "BRL");
        assert_eq!(config.recent_limit, 5);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("AGROREAL_DB_PATH", "/tmp/ledger.db"),
            ("AGROREAL_BIND_ADDR", "127.0.0.1:8080"),
            ("AGROREAL_LOCALE", "en-US"),
            ("AGROREAL_CURRENCY", "usd"),
            ("AGROREAL_RECENT_LIMIT", "10"),
        ])
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/ledger.db"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.recent_limit, 10);
        assert_eq!(config.formatter().unwrap().format(-1234.5), "-$1,234.50");
    }

    #[test]
    fn test_blank_values_fall_back() {
        let config = config(&[("AGROREAL_LOCALE", "  ")]).unwrap();
        assert_eq!(config.locale, "pt-BR");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            config(&[("AGROREAL_BIND_ADDR", "nowhere")]),
            Err(ConfigError::Invalid { key: "AGROREAL_BIND_ADDR", .. })
        ));
        assert!(matches!(
            config(&[("AGROREAL_RECENT_LIMIT", "0")]),
            Err(ConfigError::Invalid { key: "AGROREAL_RECENT_LIMIT", .. })
        ));
        assert!(matches!(
            config(&[("AGROREAL_CURRENCY", "REAL")]),
            Err(ConfigError::Format(FormatError::InvalidCurrency(_)))
        ));
        assert!(matches!(
            config(&[("AGROREAL_LOCALE", "xx-YY")]),
            Err(ConfigError::Format(FormatError::UnsupportedLocale(_)))
        ));
    }
}
