use crate::domain::types::{CacheTtlHours, FeatureLimit, RadiusMeters, TimeoutMillis};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Prefix for environment overrides, e.g. `PARCEL_PROXY__CACHE__TTL_HOURS=12`
pub const ENV_PREFIX: &str = "PARCEL_PROXY";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub proxy: ProxySettings,
    pub cache: CacheSettings,
    pub spatial: SpatialSettings,
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            environment: "development".to_string(),
        }
    }
}

/// Upstream policy: which hosts may be reached, which are cached, and timeouts
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProxySettings {
    /// Host substrings a target must contain to be forwarded
    pub allowed_domains: Vec<String>,
    /// Host substrings whose responses are cached
    pub cacheable_hosts: Vec<String>,
    /// Optional path prefixes narrowing the cacheable class; empty means any path
    #[serde(default)]
    pub cacheable_path_prefixes: Vec<String>,
    /// Query parameter holding the provider credential, dropped from cache keys and logs
    pub secret_param: String,
    /// Further credential parameters masked in logs, e.g. the map provider's `key`
    pub redacted_params: Vec<String>,
    pub cached_timeout_ms: TimeoutMillis,
    pub uncached_timeout_ms: TimeoutMillis,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            allowed_domains: vec![
                "juso.go.kr".to_string(),
                "apis.data.go.kr".to_string(),
                "api.vworld.kr".to_string(),
            ],
            cacheable_hosts: vec!["apis.data.go.kr".to_string()],
            cacheable_path_prefixes: Vec::new(),
            secret_param: "serviceKey".to_string(),
            redacted_params: vec!["key".to_string()],
            cached_timeout_ms: TimeoutMillis::try_new(15_000).expect("15s is a valid timeout"),
            uncached_timeout_ms: TimeoutMillis::try_new(10_000).expect("10s is a valid timeout"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    pub ttl_hours: CacheTtlHours,
    /// Pending background writes before new ones are dropped
    pub write_queue_capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            ttl_hours: CacheTtlHours::default(),
            write_queue_capacity: 256,
        }
    }
}

/// The WFS endpoint and layer used for nearby-broker lookups
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SpatialSettings {
    pub upstream_url: String,
    pub api_key: String,
    pub broker_typename: String,
    pub srs_name: String,
    pub output: String,
    pub result_type: String,
    pub max_features: u32,
    pub search_radius_m: RadiusMeters,
    /// Radius of the BBOX retry after a PNU query comes back empty
    pub fallback_radius_m: RadiusMeters,
    pub x_field: String,
    pub y_field: String,
    /// Identity field used to drop duplicate features
    pub dedupe_field: String,
    pub default_limit: FeatureLimit,
}

impl Default for SpatialSettings {
    fn default() -> Self {
        Self {
            upstream_url: "https://api.vworld.kr/ned/wfs/getEstateBrkpgWFS".to_string(),
            api_key: String::new(),
            broker_typename: "dt_d170".to_string(),
            srs_name: "EPSG:4326".to_string(),
            output: "GML2".to_string(),
            result_type: "results".to_string(),
            max_features: 30,
            search_radius_m: RadiusMeters::try_new(1000.0).expect("1km is a valid radius"),
            fallback_radius_m: RadiusMeters::try_new(100.0).expect("100m is a valid radius"),
            x_field: "x_crdnt".to_string(),
            y_field: "y_crdnt".to_string(),
            dedupe_field: "jurirno".to_string(),
            default_limit: FeatureLimit::try_new(30).expect("30 is a valid limit"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database_name: String,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            username: "postgres".to_string(),
            password: "password".to_string(),
            database_name: "parcel_proxy".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl Settings {
    /// Load from `./config` and the environment
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_path("config")
    }

    /// Load defaults, then `default`, `{ENVIRONMENT}` and `local` files under
    /// `dir`, then `PARCEL_PROXY__*` environment variables
    pub fn from_path(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .set_override("application.environment", environment.clone())?
            .add_source(File::with_name(&dir.join("default").to_string_lossy()).required(false))
            .add_source(File::with_name(&dir.join(&environment).to_string_lossy()).required(false))
            .add_source(File::with_name(&dir.join("local").to_string_lossy()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("proxy.allowed_domains")
                    .with_list_parse_key("proxy.cacheable_hosts")
                    .with_list_parse_key("proxy.cacheable_path_prefixes")
                    .with_list_parse_key("proxy.redacted_params")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.database.username,
            self.database.password,
            self.database.host,
            self.database.port,
            self.database.database_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_load_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::from_path(dir.path()).unwrap();

        assert_eq!(settings.proxy.secret_param, "serviceKey");
        assert_eq!(*settings.cache.ttl_hours.as_ref(), 24);
        assert_eq!(settings.cache.backend, CacheBackend::Memory);
        assert_eq!(settings.spatial.broker_typename, "dt_d170");
        assert!(settings
            .proxy
            .allowed_domains
            .iter()
            .any(|d| d == "api.vworld.kr"));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("default.toml"),
            r#"
[cache]
ttl_hours = 6

[proxy]
allowed_domains = ["example.org"]
"#,
        )
        .unwrap();

        let settings = Settings::from_path(dir.path()).unwrap();
        assert_eq!(*settings.cache.ttl_hours.as_ref(), 6);
        assert_eq!(settings.proxy.allowed_domains, vec!["example.org".to_string()]);
        // untouched sections keep their defaults
        assert_eq!(settings.proxy.secret_param, "serviceKey");
    }

    #[test]
    fn test_zero_ttl_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("default.toml"), "[cache]\nttl_hours = 0\n").unwrap();

        assert!(Settings::from_path(dir.path()).is_err());
    }

    #[test]
    fn test_database_url_format() {
        let settings = Settings::default();
        let url = settings.database_url();
        assert!(url.starts_with("postgres://"));
        assert!(url.contains(&settings.database.username));
        assert!(url.contains(&settings.database.database_name));
    }
}
