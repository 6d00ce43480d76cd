//! Gateway configuration
//!
//! Read once at startup from the process environment (after loading a
//! `.env` file when present). Every variable has a development default
//! except that production refuses the built-in JWT secret.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use platform::graphsense::GraphSenseConfig;
use platform::PlatformOptions;
use rust_decimal::Decimal;
use thiserror::Error;
use types::auth::Role;
use types::ids::{TenantId, UserId};

/// Only accepted outside production
pub const DEV_JWT_SECRET: &str = "dev-secret-do-not-use-in-production";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("JWT_SECRET must be set to a non-default value in production")]
    InsecureJwtSecret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Test,
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected text or json, got '{other}'")),
        }
    }
}

/// A configured API key and the identity it authenticates as
#[derive(Clone)]
pub struct ApiKey {
    pub key_id: String,
    pub secret: String,
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub role: Role,
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("key_id", &self.key_id)
            .field("secret", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("tenant_id", &self.tenant_id)
            .field("role", &self.role)
            .finish()
    }
}

impl FromStr for ApiKey {
    type Err = String;

    /// `key_id:secret:user_uuid:tenant:role`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        let [key_id, secret, user, tenant, role] = parts.as_slice() else {
            return Err(format!("expected key_id:secret:user_uuid:tenant:role, got {} fields", parts.len()));
        };
        if key_id.is_empty() || secret.is_empty() {
            return Err("key id and secret must not be empty".to_string());
        }
        Ok(ApiKey {
            key_id: key_id.to_string(),
            secret: secret.to_string(),
            user_id: user.parse().map_err(|e| format!("{e}"))?,
            tenant_id: TenantId::try_new(*tenant).map_err(|e| format!("{e}"))?,
            role: Role::parse(role).ok_or_else(|| format!("unknown role '{role}'"))?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    /// Keyed by key id
    pub api_keys: HashMap<String, ApiKey>,
    pub rate_limit_capacity: u32,
    pub rate_limit_refill_per_sec: f64,
    pub idempotency_ttl_secs: u64,
    pub thal_reference_price: Decimal,
    pub graphsense: Option<GraphSenseConfig>,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            api_keys: HashMap::new(),
            rate_limit_capacity: 20,
            rate_limit_refill_per_sec: 20.0,
            idempotency_ttl_secs: 86_400,
            thal_reference_price: Decimal::new(5, 2),
            graphsense: None,
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Loads `.env` (if any) and reads the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is normal outside development
        let _ = dotenvy::dotenv();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds a config from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let environment = parse_or(&lookup, "GATEWAY_ENV", defaults.environment)?;
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.jwt_secret);
        if environment == Environment::Production && jwt_secret == DEV_JWT_SECRET {
            return Err(ConfigError::InsecureJwtSecret);
        }

        let mut api_keys = HashMap::new();
        if let Some(raw) = lookup("API_KEYS") {
            for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
                let key: ApiKey = entry.parse().map_err(|reason| ConfigError::Invalid {
                    var: "API_KEYS",
                    reason,
                })?;
                api_keys.insert(key.key_id.clone(), key);
            }
        }

        let graphsense = match (lookup("GRAPHSENSE_URL"), lookup("GRAPHSENSE_API_KEY")) {
            (Some(base_url), api_key) if !base_url.is_empty() => Some(GraphSenseConfig {
                base_url,
                api_key: api_key.unwrap_or_default(),
            }),
            _ => None,
        };

        let rate_limit_capacity: u32 = parse_or(&lookup, "RATE_LIMIT_CAPACITY", defaults.rate_limit_capacity)?;
        let rate_limit_refill_per_sec: f64 =
            parse_or(&lookup, "RATE_LIMIT_REFILL_PER_SEC", defaults.rate_limit_refill_per_sec)?;
        if rate_limit_capacity == 0 || !(rate_limit_refill_per_sec > 0.0) {
            return Err(ConfigError::Invalid {
                var: "RATE_LIMIT_CAPACITY",
                reason: "capacity and refill rate must be positive".to_string(),
            });
        }

        let thal_reference_price: Decimal =
            parse_or(&lookup, "THAL_REFERENCE_PRICE", defaults.thal_reference_price)?;
        if thal_reference_price <= Decimal::ZERO {
            return Err(ConfigError::Invalid {
                var: "THAL_REFERENCE_PRICE",
                reason: "must be positive".to_string(),
            });
        }

        Ok(Config {
            environment,
            host: lookup("GATEWAY_HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "GATEWAY_PORT", defaults.port)?,
            jwt_secret,
            api_keys,
            rate_limit_capacity,
            rate_limit_refill_per_sec,
            idempotency_ttl_secs: parse_or(&lookup, "IDEMPOTENCY_TTL_SECS", defaults.idempotency_ttl_secs)?,
            thal_reference_price,
            graphsense,
            log_format: parse_or(&lookup, "LOG_FORMAT", defaults.log_format)?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn platform_options(&self) -> PlatformOptions {
        PlatformOptions {
            thal_reference_price: self.thal_reference_price,
            idempotency_ttl: Duration::seconds(i64::try_from(self.idempotency_ttl_secs).unwrap_or(i64::MAX)),
            graphsense: self.graphsense.clone(),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(var) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.rate_limit_capacity, 20);
        assert_eq!(config.thal_reference_price, Decimal::new(5, 2));
        assert!(config.graphsense.is_none());
        assert_eq!(config.platform_options().idempotency_ttl, Duration::hours(24));
    }

    #[test]
    fn test_production_rejects_dev_secret() {
        let err = Config::from_lookup(lookup(&[("GATEWAY_ENV", "production")])).unwrap_err();
        assert_eq!(err, ConfigError::InsecureJwtSecret);

        let ok = Config::from_lookup(lookup(&[("GATEWAY_ENV", "production"), ("JWT_SECRET", "s3cr3t")]));
        assert!(ok.is_ok());
    }

    #[test]
    fn test_api_keys_parse() {
        let user = UserId::new();
        let raw = format!("k1:sec1:{user}:acme:broker, k2:sec2:{user}:acme:user");
        let config = Config::from_lookup(lookup(&[("API_KEYS", raw.as_str())])).unwrap();
        assert_eq!(config.api_keys.len(), 2);
        let key = &config.api_keys["k1"];
        assert_eq!(key.role, Role::Broker);
        assert_eq!(key.tenant_id.as_str(), "acme");
        assert!(!format!("{key:?}").contains("sec1"));
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = Config::from_lookup(lookup(&[("GATEWAY_PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().starts_with("GATEWAY_PORT"));

        let err = Config::from_lookup(lookup(&[("API_KEYS", "k1:only-two")])).unwrap_err();
        assert!(err.to_string().starts_with("API_KEYS"));

        let err = Config::from_lookup(lookup(&[("LOG_FORMAT", "xml")])).unwrap_err();
        assert!(err.to_string().starts_with("LOG_FORMAT"));
    }

    #[test]
    fn test_graphsense_enabled_by_url() {
        let config = Config::from_lookup(lookup(&[
            ("GRAPHSENSE_URL", "https://api.graphsense.example"),
            ("GRAPHSENSE_API_KEY", "gs-key"),
        ]))
        .unwrap();
        let gs = config.graphsense.unwrap();
        assert_eq!(gs.api_key, "gs-key");
    }
}
