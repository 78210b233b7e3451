//! Settings schema definitions.
//!
//! One settings record for the whole service: identity fields, server
//! options, and a sub-record per instrument concern. All types derive
//! Serde traits for deserialization from config files, every field has a
//! declared default so minimal configs work, and the record is immutable
//! once constructed.

use serde::{Deserialize, Serialize};

use crate::bootstrap::BootstrapSettings;
use crate::config::merge::{merge_field, Merge};
use crate::instruments::{
    ApiDocsConfig, CorsConfig, ErrorReportingConfig, HealthConfig, LoggingConfig, MetricsConfig,
    TracingConfig,
};

/// Root settings for a bootstrapped service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name reported by telemetry, health, and API docs.
    pub service_name: String,

    /// Service version reported by telemetry, health, and API docs.
    pub service_version: String,

    /// Deployment environment (e.g. "production").
    pub service_environment: Option<String>,

    /// Debug mode; enables instrument status reporting on bootstrap.
    pub service_debug: bool,

    /// HTTP server options.
    pub server: ServerSettings,

    pub logging: LoggingConfig,
    pub tracing: TracingConfig,
    pub metrics: MetricsConfig,
    pub error_reporting: ErrorReportingConfig,
    pub health: HealthConfig,
    pub cors: CorsConfig,
    pub api_docs: ApiDocsConfig,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            service_name: "service".to_string(),
            service_version: "0.1.0".to_string(),
            service_environment: None,
            service_debug: false,
            server: ServerSettings::default(),
            logging: LoggingConfig::default(),
            tracing: TracingConfig::default(),
            metrics: MetricsConfig::default(),
            error_reporting: ErrorReportingConfig::default(),
            health: HealthConfig::default(),
            cors: CorsConfig::default(),
            api_docs: ApiDocsConfig::default(),
        }
    }
}

impl ServiceSettings {
    /// Socket address string for binding the server.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl BootstrapSettings for ServiceSettings {
    fn service_debug(&self) -> bool {
        self.service_debug
    }
}

impl Merge for ServiceSettings {
    fn merge(self, patch: Self) -> Self {
        let defaults = Self::default();
        Self {
            service_name: merge_field(self.service_name, patch.service_name, &defaults.service_name),
            service_version: merge_field(
                self.service_version,
                patch.service_version,
                &defaults.service_version,
            ),
            service_environment: merge_field(
                self.service_environment,
                patch.service_environment,
                &defaults.service_environment,
            ),
            service_debug: merge_field(
                self.service_debug,
                patch.service_debug,
                &defaults.service_debug,
            ),
            server: self.server.merge(patch.server),
            logging: self.logging.merge(patch.logging),
            tracing: self.tracing.merge(patch.tracing),
            metrics: self.metrics.merge(patch.metrics),
            error_reporting: self.error_reporting.merge(patch.error_reporting),
            health: self.health.merge(patch.health),
            cors: self.cors.merge(patch.cors),
            api_docs: self.api_docs.merge(patch.api_docs),
        }
    }
}

/// HTTP server options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind host.
    pub host: String,

    /// Bind port.
    pub port: u16,

    /// Request timeout in seconds, applied to the whole application.
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout_secs: 30,
        }
    }
}

impl Merge for ServerSettings {
    fn merge(self, patch: Self) -> Self {
        let defaults = Self::default();
        Self {
            host: merge_field(self.host, patch.host, &defaults.host),
            port: merge_field(self.port, patch.port, &defaults.port),
            request_timeout_secs: merge_field(
                self.request_timeout_secs,
                patch.request_timeout_secs,
                &defaults.request_timeout_secs,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_parses_with_defaults() {
        let settings: ServiceSettings = toml::from_str("").unwrap();
        assert_eq!(settings, ServiceSettings::default());
    }

    #[test]
    fn nested_tables_parse() {
        let settings: ServiceSettings = toml::from_str(
            r#"
            service_name = "orders"
            service_debug = true

            [server]
            port = 9000

            [tracing]
            endpoint = "http://otel-collector:4317"
            sample_ratio = 0.25

            [cors]
            allow_origins = ["https://app.example.com"]

            [error_reporting]
            sentry_dsn = "https://key@sentry.example.com/1"
            "#,
        )
        .unwrap();

        assert_eq!(settings.service_name, "orders");
        assert!(settings.service_debug);
        assert_eq!(settings.server.port, 9000);
        assert_eq!(
            settings.tracing.endpoint.as_deref(),
            Some("http://otel-collector:4317")
        );
        assert_eq!(settings.tracing.sample_ratio, 0.25);
        assert_eq!(settings.cors.allow_origins.len(), 1);
        assert!(settings.error_reporting.sentry_dsn.is_some());
    }

    #[test]
    fn bind_address_combines_host_and_port() {
        let mut settings = ServiceSettings::default();
        settings.server.host = "127.0.0.1".to_string();
        settings.server.port = 8080;
        assert_eq!(settings.bind_address(), "127.0.0.1:8080");
    }
}
