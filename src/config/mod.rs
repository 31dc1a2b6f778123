use std::collections::HashMap;
use std::env;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub tenancy: TenancyConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Tenant resolution settings: the untrusted pre-auth header, the static
/// host:port table for local development, and the literal-hostname fallback
/// used by multi-domain deployments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenancyConfig {
    pub header_name: String,
    pub host_map: HashMap<String, String>,
    pub use_host_fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            header_name: "X-Tenant-Id".to_string(),
            host_map: default_host_map(),
            use_host_fallback: true,
        }
    }
}

fn default_host_map() -> HashMap<String, String> {
    HashMap::from([
        ("localhost:5114".to_string(), "rajeev-pvt".to_string()),
        ("localhost:7001".to_string(), "green-pantry".to_string()),
        ("localhost:7002".to_string(), "bangaru-kottu".to_string()),
    ])
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Tenancy overrides
        if let Ok(v) = env::var("TENANCY_HEADER_NAME") {
            self.tenancy.header_name = v;
        }
        if let Ok(v) = env::var("TENANCY_HOST_MAP") {
            self.tenancy.host_map = parse_host_map(&v);
        }
        if let Ok(v) = env::var("TENANCY_USE_HOST_FALLBACK") {
            self.tenancy.use_host_fallback = v.parse().unwrap_or(self.tenancy.use_host_fallback);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout_secs =
                v.parse().unwrap_or(self.database.connection_timeout_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            tenancy: TenancyConfig::default(),
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout_secs: 30,
            },
            security: SecurityConfig {
                jwt_secret: "storefront-dev-secret".to_string(),
                jwt_expiry_hours: 24 * 7,
                enable_cors: true,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            tenancy: TenancyConfig::default(),
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout_secs: 10,
            },
            security: SecurityConfig {
                // Must be supplied via JWT_SECRET outside development
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            tenancy: TenancyConfig {
                header_name: "X-Tenant-Id".to_string(),
                host_map: HashMap::new(),
                use_host_fallback: true,
            },
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout_secs: 5,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }
}

/// Parse "host:port=tenant,host:port=tenant" into a lookup table.
fn parse_host_map(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (host, tenant) = pair.split_once('=')?;
            let (host, tenant) = (host.trim(), tenant.trim());
            if host.is_empty() || tenant.is_empty() {
                return None;
            }
            Some((host.to_string(), tenant.to_string()))
        })
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_config_maps_local_ports() {
        let config = AppConfig::development();
        assert_eq!(
            config.tenancy.host_map.get("localhost:5114").map(String::as_str),
            Some("rajeev-pvt")
        );
        assert_eq!(
            config.tenancy.host_map.get("localhost:7001").map(String::as_str),
            Some("green-pantry")
        );
        assert!(config.tenancy.use_host_fallback);
    }

    #[test]
    fn production_config_has_no_dev_host_map() {
        let config = AppConfig::production();
        assert!(config.tenancy.host_map.is_empty());
        assert!(config.security.jwt_secret.is_empty());
    }

    #[test]
    fn parses_host_map_pairs() {
        let map = parse_host_map("localhost:9000=acme, shop.local:80=globex,bad-pair");
        assert_eq!(map.get("localhost:9000").map(String::as_str), Some("acme"));
        assert_eq!(map.get("shop.local:80").map(String::as_str), Some("globex"));
        assert_eq!(map.len(), 2);
    }
}
