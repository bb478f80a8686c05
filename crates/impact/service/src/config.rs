//! Configuration for impactd

use impact_anchor::RetryPolicy;
use impact_ledger::LedgerConfig;
use impact_ranking::{GeographyTiers, RankingConfig};
use impact_trust::TrustConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

/// Main engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub ranking: RankingConfig,

    /// Replaces the built-in city table when set
    #[serde(default)]
    pub geography: Option<GeographyTiers>,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub trust: TrustConfig,

    /// Organization scores served when no trust endpoint is configured
    #[serde(default)]
    pub trust_scores: BTreeMap<String, u8>,

    #[serde(default)]
    pub anchoring: AnchoringConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enable_cors: true,
        }
    }
}

/// Cause and volunteer seed data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// JSON file with `causes` and `volunteers` arrays
    #[serde(default)]
    pub seed_path: Option<String>,
}

/// Anchoring transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchoringConfig {
    /// Anchoring service base URL. Unset means the in-process ledger.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_anchor_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default)]
    pub retry: RetryPolicy,
}

impl AnchoringConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for AnchoringConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            request_timeout_ms: default_anchor_request_timeout_ms(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_true() -> bool {
    true
}

fn default_anchor_request_timeout_ms() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EngineConfig {
    /// Defaults, then the optional file, then `IMPACT_` environment
    /// variables (`IMPACT_SERVER__LISTEN_ADDR`, `IMPACT_TRUST__TTL_SECS`, ...).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&EngineConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("IMPACT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
