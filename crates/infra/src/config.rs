//! Configuration loading and representation.
//!
//! Everything comes from environment variables; callers (e.g. CLI flags) may
//! override individual fields after loading.

use thiserror::Error;

use voucherbook_vouchers::DisplayOffset;

pub const DATABASE_URL: &str = "DATABASE_URL";
pub const DISPLAY_OFFSET_HOURS: &str = "VOUCHERBOOK_DISPLAY_OFFSET_HOURS";
pub const DB_MAX_CONNECTIONS: &str = "VOUCHERBOOK_DB_MAX_CONNECTIONS";

const DEFAULT_DISPLAY_OFFSET_HOURS: i32 = 7;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is required but not set")]
    Missing { key: &'static str },

    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfraConfig {
    pub database_url: Option<String>,
    pub display_offset_hours: i32,
    pub db_max_connections: u32,
}

impl Default for InfraConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            display_offset_hours: DEFAULT_DISPLAY_OFFSET_HOURS,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
        }
    }
}

impl InfraConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (process env in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let display_offset_hours = match read(DISPLAY_OFFSET_HOURS) {
            Some(raw) => parse_display_offset(&raw)?,
            None => defaults.display_offset_hours,
        };

        let db_max_connections = match read(DB_MAX_CONNECTIONS) {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: DB_MAX_CONNECTIONS,
                        value: raw,
                        reason: "expected a positive integer".to_string(),
                    });
                }
            },
            None => defaults.db_max_connections,
        };

        Ok(Self {
            database_url: read(DATABASE_URL),
            display_offset_hours,
            db_max_connections,
        })
    }

    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::Missing { key: DATABASE_URL })
    }

    pub fn display_offset(&self) -> Result<DisplayOffset, ConfigError> {
        DisplayOffset::from_hours(self.display_offset_hours).map_err(|e| ConfigError::Invalid {
            key: DISPLAY_OFFSET_HOURS,
            value: self.display_offset_hours.to_string(),
            reason: e.to_string(),
        })
    }
}

fn parse_display_offset(raw: &str) -> Result<i32, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        key: DISPLAY_OFFSET_HOURS,
        value: raw.to_string(),
        reason,
    };

    let hours = raw
        .trim()
        .parse::<i32>()
        .map_err(|e| invalid(e.to_string()))?;
    DisplayOffset::from_hours(hours).map_err(|e| invalid(e.to_string()))?;
    Ok(hours)
}
