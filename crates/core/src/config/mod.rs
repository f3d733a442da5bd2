//! Gatekeeper configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (GHOSTSTOCK_*)
//! 2. TOML config file (if GHOSTSTOCK_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Current cache generation tag. Bump to invalidate every stored asset on the
/// next activation.
pub const CACHE_NAME: &str = "ghoststock-cache-v4";

/// Assets that must be stored in the current generation at install time.
pub const PRECACHE_ASSETS: &[&str] = &["/static/css/styles.css", "/static/js/main.js", "/static/img/logo.png"];

/// Gatekeeper configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (GHOSTSTOCK_*)
/// 2. TOML config file (if GHOSTSTOCK_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Cache generation tag.
    ///
    /// Set via GHOSTSTOCK_CACHE_NAME environment variable.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Asset manifest, as paths resolved against `origin`.
    ///
    /// Set via GHOSTSTOCK_PRECACHE environment variable (`[a,b,c]`).
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Origin the page and its assets are served from.
    ///
    /// Set via GHOSTSTOCK_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path prefix under `origin` of the pages the gatekeeper controls.
    ///
    /// Set via GHOSTSTOCK_SCOPE environment variable.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Path to SQLite cache database.
    ///
    /// Set via GHOSTSTOCK_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    ///
    /// Set via GHOSTSTOCK_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes buffered per response.
    ///
    /// Set via GHOSTSTOCK_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network request timeout in milliseconds. Unset means no timeout.
    ///
    /// Set via GHOSTSTOCK_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Activate right after a successful install.
    ///
    /// Set via GHOSTSTOCK_SKIP_WAITING environment variable.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Take control of already-open pages on activation.
    ///
    /// Set via GHOSTSTOCK_CLAIM_CLIENTS environment variable.
    #[serde(default = "default_true")]
    pub claim_clients: bool,
}

fn default_cache_name() -> String {
    CACHE_NAME.into()
}

fn default_precache() -> Vec<String> {
    PRECACHE_ASSETS.iter().map(|s| s.to_string()).collect()
}

fn default_origin() -> String {
    "http://127.0.0.1:5000".into()
}

fn default_scope() -> String {
    "/".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./ghoststock-cache.sqlite")
}

fn default_user_agent() -> String {
    "ghoststock-gate/0.1".into()
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_true() -> bool {
    true
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            cache_name: default_cache_name(),
            precache: default_precache(),
            origin: default_origin(),
            scope: default_scope(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: None,
            skip_waiting: true,
            claim_clients: true,
        }
    }
}

impl GateConfig {
    /// Timeout as Duration for use with reqwest, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Parsed origin. Validation guarantees this succeeds on loaded configs.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `GHOSTSTOCK_`
    /// 2. TOML file from `GHOSTSTOCK_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("GHOSTSTOCK_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("GHOSTSTOCK_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
