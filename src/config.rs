//! Service configuration.

/// Default HTTP port.
const DEFAULT_PORT: u16 = 8080;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    /// SQLite database file. `None` keeps everything in memory.
    pub database_path: Option<String>,
    /// Allowed CORS origin. `None` allows any origin.
    pub cors_origin: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_path: None,
            cors_origin: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.port, 8080);
        assert!(config.database_path.is_none());
        assert!(config.cors_origin.is_none());
    }
}
