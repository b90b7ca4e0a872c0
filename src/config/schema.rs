//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::account::AccountEntry;
use crate::filter::{FilterStage, OnError};
use crate::forwarding::{FieldPolicy, MissingAccountPolicy};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Route definitions mapping requests to upstreams.
    pub routes: Vec<RouteConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Header hygiene settings.
    pub security: SecurityConfig,

    /// Forwarded account header settings.
    pub forwarded_account: ForwardedAccountConfig,

    /// Current-account endpoint settings.
    pub me: MeConfig,

    /// Accounts known to the authentication stage.
    pub accounts: Vec<AccountEntry>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Route configuration mapping requests to an upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Host header to match (exact match).
    #[serde(default)]
    pub host: Option<String>,

    /// Path prefix to match.
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,

    /// Upstream base URL (`http://host:port/base`).
    pub url: String,

    /// Remove the matched prefix before forwarding.
    #[serde(default = "default_strip_prefix")]
    pub strip_prefix: bool,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,
}

fn default_path_prefix() -> String {
    "/".to_string()
}

fn default_strip_prefix() -> bool {
    true
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Header hygiene configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Add X-Forwarded-For/Host/Proto/Prefix to upstream requests.
    pub add_forwarded_headers: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            add_forwarded_headers: true,
        }
    }
}

/// Forwarded account header configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardedAccountConfig {
    /// Register the forwarding filter.
    pub enabled: bool,

    /// Filter chain stage.
    pub filter_type: FilterStage,

    /// Order among filters of the same stage (lower runs first).
    pub filter_order: i32,

    /// Outbound header name.
    pub header_name: String,

    /// Attribute allow-list; empty means all attributes.
    pub included_properties: Vec<String>,

    /// Attribute deny-list; overrides the allow-list.
    pub excluded_properties: Vec<String>,

    /// What to do with a client-supplied header when no account is attached.
    pub on_missing_account: MissingAccountPolicy,

    /// What to do when the header value cannot be produced.
    pub on_error: OnError,
}

impl Default for ForwardedAccountConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            filter_type: FilterStage::Pre,
            filter_order: 0,
            header_name: "X-Forwarded-Account".to_string(),
            included_properties: vec!["groups".to_string(), "customData".to_string()],
            excluded_properties: Vec::new(),
            on_missing_account: MissingAccountPolicy::Preserve,
            on_error: OnError::Omit,
        }
    }
}

impl ForwardedAccountConfig {
    pub fn field_policy(&self) -> FieldPolicy {
        FieldPolicy::new(
            self.included_properties.iter().cloned(),
            self.excluded_properties.iter().cloned(),
        )
    }
}

/// Current-account endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MeConfig {
    pub enabled: bool,

    /// Request path served by the gateway itself.
    pub path: String,

    /// Linked attributes to include in the response.
    pub expand: Vec<String>,
}

impl Default for MeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/me".to_string(),
            expand: Vec::new(),
        }
    }
}

impl MeConfig {
    pub fn field_policy(&self) -> FieldPolicy {
        FieldPolicy::all().with_expand(self.expand.iter().cloned())
    }
}
