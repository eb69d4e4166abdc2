use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub sso: SsoConfig,
    pub integrations: IntegrationsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub page_size: i64,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

/// Single-sign-on handoff to the third-party commenting widget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsoConfig {
    pub secret_key: String,
    pub account_uniquifier: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationsConfig {
    pub gis_proxy_root: String,
    /// Opaque widget config blob, passed through to the app shell verbatim.
    pub twitter_config: Value,
    pub auth_providers: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // API overrides
        if let Ok(v) = env::var("API_PAGE_SIZE") {
            self.api.page_size = v.parse().unwrap_or(self.api.page_size);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // SSO overrides
        if let Ok(v) = env::var("SSO_SECRET_KEY") {
            self.sso.secret_key = v;
        }
        if let Ok(v) = env::var("ACCOUNT_UNIQUIFIER") {
            self.sso.account_uniquifier = v;
        }

        // Integration overrides
        if let Ok(v) = env::var("GIS_PROXY_ROOT") {
            self.integrations.gis_proxy_root = v;
        }
        if let Ok(v) = env::var("TWITTER_CONFIG") {
            self.integrations.twitter_config =
                serde_json::from_str(&v).unwrap_or(Value::Object(Default::default()));
        }
        if let Ok(v) = env::var("AUTH_PROVIDERS") {
            self.integrations.auth_providers = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    fn base(environment: Environment) -> Self {
        Self {
            environment,
            api: ApiConfig {
                page_size: 20,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                enable_cors: true,
                cors_origins: vec![],
            },
            sso: SsoConfig {
                secret_key: String::new(),
                account_uniquifier: String::new(),
            },
            integrations: IntegrationsConfig {
                gis_proxy_root: "http://gis.phila.gov/ArcGIS/rest/services/PhilaGov".to_string(),
                twitter_config: json!({}),
                auth_providers: vec!["twitter".to_string(), "facebook".to_string()],
            },
        }
    }

    fn development() -> Self {
        let mut config = Self::base(Environment::Development);
        config.security.jwt_secret = "development-secret".to_string();
        config.security.jwt_expiry_hours = 24 * 7;
        config.security.cors_origins = vec![
            "http://localhost:3000".to_string(),
            "http://localhost:5173".to_string(),
        ];
        config.sso.secret_key = "development-sso-secret".to_string();
        config.sso.account_uniquifier = "-dev".to_string();
        config
    }

    fn staging() -> Self {
        let mut config = Self::base(Environment::Staging);
        config.api.enable_request_logging = true;
        config
    }

    fn production() -> Self {
        let mut config = Self::base(Environment::Production);
        config.api.enable_request_logging = false;
        config.security.jwt_expiry_hours = 4;
        config
    }
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
    fn development_defaults() {
        let config = AppConfig::development();
        assert_eq!(config.api.page_size, 20);
        assert!(!config.sso.secret_key.is_empty());
        assert_eq!(config.sso.account_uniquifier, "-dev");
        assert!(config.integrations.auth_providers.contains(&"twitter".to_string()));
    }

    #[test]
    fn production_has_no_baked_in_secrets() {
        let config = AppConfig::production();
        assert!(config.security.jwt_secret.is_empty());
        assert!(config.sso.secret_key.is_empty());
        assert_eq!(config.security.jwt_expiry_hours, 4);
    }
}
