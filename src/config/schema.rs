//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge
//! service. All types derive Serde traits for deserialization from config
//! files, and every section falls back to its defaults when omitted.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the edge service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EdgeConfig {
    /// Listener configuration (bind address, concurrency).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Identity of this point of presence.
    pub service: ServiceConfig,

    /// Secret store settings.
    pub secrets: SecretsConfig,

    /// Weather route settings.
    pub weather: WeatherConfig,

    /// ESI route settings.
    pub esi: EsiConfig,

    /// Skywards route settings.
    pub skywards: SkywardsConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:7676").
    pub bind_address: String,

    /// Maximum requests served concurrently (backpressure).
    pub max_concurrent_requests: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:7676".to_string(),
            max_concurrent_requests: 10_000,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Upstream connection establishment timeout in seconds.
    pub upstream_connect_secs: u64,

    /// Upstream request timeout in seconds.
    pub upstream_request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_connect_secs: 5,
            upstream_request_secs: 20,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Include request and response headers in access log records.
    pub access_log_headers: bool,

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
            access_log_headers: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Value of the `x-served-by` response header.
    pub pop_name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            pop_name: "edge-local".to_string(),
        }
    }
}

/// Where the secret payload is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SecretSource {
    File,
    #[default]
    Env,
}

/// Secret store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecretsConfig {
    pub source: SecretSource,

    /// JSON file path, used when `source = "file"`.
    pub path: Option<PathBuf>,

    /// Environment variable name, used when `source = "env"`.
    pub env_var: Option<String>,

    /// Key of the object holding the secret map.
    pub item: String,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            source: SecretSource::Env,
            path: None,
            env_var: Some("EDGE_SECRETS".to_string()),
            item: "secrets".to_string(),
        }
    }
}

/// A fixed geographic location.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: 51.5072,
            longitude: -0.1276,
            city: "London".to_string(),
        }
    }
}

/// Weather route configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Forecast API base URL.
    pub base_url: String,

    /// Bearer token used when the `API_TOKEN` secret is unavailable.
    pub default_api_token: String,

    /// Location used when the request carries no geo headers.
    pub default_location: LocationConfig,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.open-meteo.com".to_string(),
            default_api_token: "helloworld".to_string(),
            default_location: LocationConfig::default(),
        }
    }
}

/// One element replacement rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RewriteRuleConfig {
    /// `tag` or `tag.class`.
    pub selector: String,

    /// Markup emitted in place of each matching element.
    pub replacement: String,
}

/// ESI route configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EsiConfig {
    /// Page fetched and rewritten by `/esi`.
    pub origin_url: String,

    pub rules: Vec<RewriteRuleConfig>,
}

impl Default for EsiConfig {
    fn default() -> Self {
        Self {
            origin_url: "https://main--dnata--cpilsworth.aem.live/".to_string(),
            rules: vec![RewriteRuleConfig {
                selector: "div.esi".to_string(),
                replacement: r#"<esi:include src="/skywards" />"#.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SkywardsConfig {
    /// Page title rendered into the dashboard template.
    pub title: String,
}

impl Default for SkywardsConfig {
    fn default() -> Self {
        Self {
            title: "Dynamic Edge HTML".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: EdgeConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:7676");
        assert_eq!(config.secrets.item, "secrets");
        assert_eq!(config.weather.default_api_token, "helloworld");
        assert_eq!(config.esi.rules.len(), 1);
        assert_eq!(config.esi.rules[0].selector, "div.esi");
        assert_eq!(config.skywards.title, "Dynamic Edge HTML");
    }

    #[test]
    fn test_partial_sections() {
        let config: EdgeConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [observability]
            log_format = "json"
            access_log_headers = true

            [secrets]
            source = "file"
            path = "/etc/edge/secrets.json"

            [[esi.rules]]
            selector = "span.promo"
            replacement = "<b>promo</b>"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.listener.max_concurrent_requests, 10_000);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert!(config.observability.access_log_headers);
        assert_eq!(config.secrets.source, SecretSource::File);
        assert_eq!(config.secrets.item, "secrets");
        assert_eq!(config.esi.rules.len(), 1);
        assert_eq!(config.esi.rules[0].selector, "span.promo");
        assert_eq!(config.esi.origin_url, EsiConfig::default().origin_url);
    }
}
