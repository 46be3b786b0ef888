//! Application configuration loaded from environment variables.

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string; in-memory storage when unset
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `5`)
/// - `MEMBERS_FILE`: JSON file of members loaded into the directory at start-up
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub members_file: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.max_connections),
            members_file: lookup("MEMBERS_FILE").filter(|path| !path.is_empty()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            max_connections: 5,
            members_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert!(config.database_url.is_none());
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn test_reads_database_settings() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/gifts"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("MEMBERS_FILE", "members.json"),
        ]);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/gifts")
        );
        assert_eq!(config.max_connections, 12);
        assert_eq!(config.members_file.as_deref(), Some("members.json"));
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = config_from(&[("PORT", "http"), ("DATABASE_MAX_CONNECTIONS", "-1")]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn test_empty_database_url_means_in_memory() {
        let config = config_from(&[("DATABASE_URL", "")]);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_addr_formatting() {
        let config = config_from(&[("HOST", "127.0.0.1"), ("PORT", "8080")]);
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }
}
