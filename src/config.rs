use std::env;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: Option<String>,
    pub log_level: String,
    pub max_connections: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set to a Postgres instance")]
    MissingDatabaseUrl,
    #[error("REPORT_DB_MAX_CONNECTIONS must be a positive integer, got '{0}'")]
    InvalidMaxConnections(String),
}

impl Settings {
    /// Reads settings from the process environment, loading `.env` first.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let log_level = lookup("REPORT_LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let max_connections = match lookup("REPORT_DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or(ConfigError::InvalidMaxConnections(raw))?,
            None => 5,
        };

        Ok(Self {
            database_url,
            log_level,
            max_connections,
        })
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::MissingDatabaseUrl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_without_environment() {
        let settings = settings_from(&[]).expect("defaults");
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.max_connections, 5);
        assert!(matches!(
            settings.database_url(),
            Err(ConfigError::MissingDatabaseUrl)
        ));
    }

    #[test]
    fn reads_explicit_values() {
        let settings = settings_from(&[
            ("DATABASE_URL", "postgres://coach@localhost/reports"),
            ("REPORT_LOG_LEVEL", "debug"),
            ("REPORT_DB_MAX_CONNECTIONS", "12"),
        ])
        .expect("valid settings");

        assert_eq!(
            settings.database_url().expect("url set"),
            "postgres://coach@localhost/reports"
        );
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.max_connections, 12);
    }

    #[test]
    fn rejects_bad_pool_size() {
        for raw in ["0", "-1", "many"] {
            let err = settings_from(&[("REPORT_DB_MAX_CONNECTIONS", raw)]).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidMaxConnections(ref value) if value == raw));
        }
    }

    #[test]
    fn blank_database_url_counts_as_missing() {
        let settings = settings_from(&[("DATABASE_URL", "  ")]).expect("settings");
        assert!(settings.database_url.is_none());
    }
}
