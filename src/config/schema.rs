//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the TOML file.
//! Every section has defaults so a minimal file only declares mechanisms and
//! rule providers.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::pipeline::MechanismConfig;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WardenConfig {
    /// Request boundary (bind address, operating mode, timeouts).
    pub serve: ServeConfig,

    pub admin: AdminConfig,

    pub observability: ObservabilityConfig,

    /// Key material for signing mutators.
    pub signer: Option<SignerConfig>,

    /// Named mechanism prototypes referenced by rules.
    pub mechanisms: MechanismsConfig,

    /// Rule-set reconciliation and providers.
    pub rules: RulesConfig,
}

/// How the request boundary answers an allowed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServeMode {
    /// Answer `200 OK` with the upstream headers; a fronting proxy forwards.
    #[default]
    Decision,
    /// Forward the request to the rule's upstream.
    Proxy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Bind address (e.g., "0.0.0.0:4456").
    pub bind_address: String,

    pub mode: ServeMode,

    /// Total time budget for one request, mechanisms and upstream included.
    pub request_timeout_secs: u64,

    /// Include the error message in error responses.
    pub verbose_errors: bool,

    /// Honour `X-Forwarded-*` headers when reconstructing the request URL.
    pub trust_forwarded_headers: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4456".to_string(),
            mode: ServeMode::Decision,
            request_timeout_secs: 30,
            verbose_errors: false,
            trust_forwarded_headers: false,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            bind_address: "127.0.0.1:4457".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// HS256 signing key.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SignerConfig {
    #[serde(default = "default_key_id")]
    pub key_id: String,

    /// Shared secret; at least 32 bytes.
    pub secret: String,
}

fn default_key_id() -> String {
    "warden".to_string()
}

/// Prototype declarations per mechanism kind.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MechanismsConfig {
    pub authenticators: Vec<PrototypeConfig>,
    pub authorizers: Vec<PrototypeConfig>,
    pub mutators: Vec<PrototypeConfig>,
    pub error_handlers: Vec<PrototypeConfig>,
}

/// One named prototype.
///
/// ```toml
/// [[mechanisms.authenticators]]
/// id = "anon"
/// type = "anonymous"
/// config = { subject = "guest" }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrototypeConfig {
    pub id: String,

    /// Registry type tag.
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub config: MechanismConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Capacity of the provider event queue.
    pub queue_capacity: usize,

    pub providers: ProvidersConfig,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            providers: ProvidersConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    pub file: Option<FileProviderConfig>,
}

/// Rule-set files on disk.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileProviderConfig {
    pub paths: Vec<PathBuf>,

    /// Reload files when they change.
    #[serde(default)]
    pub watch: bool,
}
