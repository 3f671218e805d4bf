use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub scheduler: SchedulerConfig,
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Falls back to `DATABASE_URL` when unset.
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub sweep_interval_secs: u64,
}

/// Optional first administrator, created on an empty store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub admin_first_name: String,
    pub admin_last_name: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            admin_email: None,
            admin_password: None,
            admin_first_name: "Admin".to_string(),
            admin_last_name: "Admin".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

impl AppConfig {
    /// Profile defaults, then the YAML file named by `ACHEER_CONFIG_FILE`,
    /// then individual environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::profile();
        if let Ok(path) = env::var("ACHEER_CONFIG_FILE") {
            config = config.with_file(Path::new(&path))?;
        }
        Ok(config.with_env_overrides())
    }

    /// Like [`AppConfig::load`], ignoring an unreadable config file.
    pub fn from_env() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Ignoring config file: {}", e);
            Self::profile().with_env_overrides()
        })
    }

    fn profile() -> Self {
        match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Self::production(),
            Ok("staging") | Ok("stage") => Self::staging(),
            _ => Self::development(),
        }
    }

    /// Overlays a YAML document onto this config. Keys absent from the file keep their value.
    pub fn with_file(self, path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        self.with_yaml(&raw).map_err(|source| ConfigError::Parse { path: display, source })
    }

    fn with_yaml(self, raw: &str) -> Result<Self, serde_yaml::Error> {
        let overlay: serde_yaml::Value = serde_yaml::from_str(raw)?;
        let mut base = serde_yaml::to_value(&self)?;
        merge(&mut base, overlay);
        serde_yaml::from_value(base)
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        if let Ok(v) = env::var("SCHEDULER_ENABLED") {
            self.scheduler.enabled = v.parse().unwrap_or(self.scheduler.enabled);
        }
        if let Ok(v) = env::var("SCHEDULER_SWEEP_INTERVAL_SECS") {
            self.scheduler.sweep_interval_secs = v.parse().unwrap_or(self.scheduler.sweep_interval_secs);
        }

        if let Ok(v) = env::var("BOOTSTRAP_ADMIN_EMAIL") {
            self.bootstrap.admin_email = Some(v);
        }
        if let Ok(v) = env::var("BOOTSTRAP_ADMIN_PASSWORD") {
            self.bootstrap.admin_password = Some(v);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 9001,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                jwt_secret: "acheer-development-secret".to_string(),
                jwt_expiry_hours: 12,
            },
            scheduler: SchedulerConfig {
                enabled: true,
                sweep_interval_secs: 30,
            },
            bootstrap: BootstrapConfig::default(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 9001,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 12,
            },
            scheduler: SchedulerConfig {
                enabled: true,
                sweep_interval_secs: 60,
            },
            bootstrap: BootstrapConfig::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 9001,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 12,
            },
            scheduler: SchedulerConfig {
                enabled: true,
                sweep_interval_secs: 60,
            },
            bootstrap: BootstrapConfig::default(),
        }
    }
}

fn merge(base: &mut serde_yaml::Value, overlay: serde_yaml::Value) {
    match (base, overlay) {
        (serde_yaml::Value::Mapping(base), serde_yaml::Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(!config.security.jwt_secret.is_empty());
        assert_eq!(config.security.jwt_expiry_hours, 12);
        assert!(config.scheduler.enabled);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.security.jwt_secret.is_empty());
        assert_eq!(config.database.max_connections, 50);
    }

    #[test]
    fn test_yaml_overlay_keeps_unlisted_keys() {
        let config = AppConfig::development()
            .with_yaml("server:\n  port: 8080\nscheduler:\n  sweep_interval_secs: 5\n")
            .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.scheduler.sweep_interval_secs, 5);
        assert!(config.scheduler.enabled);
    }

    #[test]
    fn test_yaml_overlay_rejects_wrong_types() {
        assert!(AppConfig::development().with_yaml("server:\n  port: lots\n").is_err());
    }
}
