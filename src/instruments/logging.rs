//! Logging instrument.
//!
//! Owns global log setup (the `tracing-subscriber` registry) and
//! contributes two pieces of request middleware: request-id propagation
//! and structured request logging with excluded paths.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};
use uuid::Uuid;

use crate::bootstrap::axum::{AxumAppConfig, AxumFramework};
use crate::config::merge::{merge_field, Merge};
use crate::config::ServiceSettings;
use crate::error::BootstrapError;

use super::{Instrument, InstrumentConfig, InstrumentKind};

/// Header used to propagate request IDs.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Maximum accepted length for an incoming request ID.
const MAX_REQUEST_ID_LENGTH: usize = 64;

/// Logging options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Master switch for the logging instrument.
    pub enabled: bool,
    /// Log level filter used when `RUST_LOG` is not set.
    pub level: String,
    /// Emit JSON log lines instead of the compact human format.
    pub json: bool,
    /// Paths excluded from request logging.
    pub exclude_paths: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json: false,
            exclude_paths: vec!["/health".to_string(), "/metrics".to_string()],
        }
    }
}

impl Merge for LoggingConfig {
    fn merge(self, patch: Self) -> Self {
        let defaults = Self::default();
        Self {
            enabled: merge_field(self.enabled, patch.enabled, &defaults.enabled),
            level: merge_field(self.level, patch.level, &defaults.level),
            json: merge_field(self.json, patch.json, &defaults.json),
            exclude_paths: merge_field(
                self.exclude_paths,
                patch.exclude_paths,
                &defaults.exclude_paths,
            ),
        }
    }
}

/// Request ID for the current request, stored in request extensions.
#[derive(Debug, Clone)]
pub struct RequestId(Arc<str>);

impl RequestId {
    fn generate() -> Self {
        Self(Uuid::new_v4().to_string().into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct LoggingInstrument {
    config: LoggingConfig,
}

impl LoggingInstrument {
    pub fn new(config: LoggingConfig) -> Self {
        Self { config }
    }
}

/// Factory registered for the axum framework.
pub fn factory(settings: &ServiceSettings) -> Box<dyn Instrument<AxumFramework>> {
    Box::new(LoggingInstrument::new(settings.logging.clone()))
}

impl Instrument<AxumFramework> for LoggingInstrument {
    fn kind(&self) -> InstrumentKind {
        InstrumentKind::Logging
    }

    fn configure(&mut self, patch: InstrumentConfig) {
        if let InstrumentConfig::Logging(patch) = patch {
            self.config = std::mem::take(&mut self.config).merge(patch);
        }
    }

    fn is_ready(&self) -> bool {
        self.config.enabled
    }

    fn not_ready_reason(&self) -> &'static str {
        "logging is disabled"
    }

    fn bootstrap(&mut self) -> Result<(), BootstrapError> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.level));

        let fmt_layer = if self.config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .compact()
                .boxed()
        };

        let initialized = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(sentry::integrations::tracing::layer())
            .try_init();
        if initialized.is_err() {
            debug!("global tracing subscriber already installed, keeping it");
        }
        Ok(())
    }

    fn bootstrap_before(&mut self) -> AxumAppConfig {
        if !self.is_ready() {
            return AxumAppConfig::default();
        }
        let exclude: Arc<[String]> = self.config.exclude_paths.clone().into();
        AxumAppConfig::default()
            // request-id is pushed second so it wraps the logger and the
            // extension is visible when the log line is written
            .with_layer(move |router: Router| {
                router.layer(middleware::from_fn(move |request: Request, next: Next| {
                    let exclude = Arc::clone(&exclude);
                    async move { log_request(exclude, request, next).await }
                }))
            })
            .with_layer(|router: Router| {
                router.layer(middleware::from_fn(propagate_request_id))
            })
    }
}

/// Extract the inbound request ID or generate one, expose it to handlers
/// via extensions, and echo it on the response.
async fn propagate_request_id(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LENGTH)
        .map(|id| RequestId(Arc::from(id)))
        .unwrap_or_else(RequestId::generate);

    request.extensions_mut().insert(request_id.clone());
    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}

async fn log_request(exclude: Arc<[String]>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if exclude.iter().any(|excluded| excluded == &path) {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let request_id = request.extensions().get::<RequestId>().cloned();
    let start = Instant::now();
    let response = next.run(request).await;
    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        request_id = request_id.as_ref().map(RequestId::as_str),
        "request completed"
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_by_default() {
        let instrument = LoggingInstrument::new(LoggingConfig::default());
        assert!(instrument.is_ready());
    }

    #[test]
    fn disabled_is_not_ready_and_contributes_nothing() {
        let mut instrument = LoggingInstrument::new(LoggingConfig {
            enabled: false,
            ..LoggingConfig::default()
        });
        assert!(!instrument.is_ready());
        let contribution = instrument.bootstrap_before();
        assert!(contribution.routers.is_empty());
        assert!(contribution.layers.is_empty());
    }

    #[test]
    fn configure_merges_non_default_fields() {
        let mut instrument = LoggingInstrument::new(LoggingConfig {
            level: "debug".to_string(),
            ..LoggingConfig::default()
        });
        instrument.configure(InstrumentConfig::Logging(LoggingConfig {
            json: true,
            ..LoggingConfig::default()
        }));
        assert_eq!(instrument.config.level, "debug");
        assert!(instrument.config.json);
    }

    #[test]
    fn configure_ignores_other_kinds() {
        let mut instrument = LoggingInstrument::new(LoggingConfig::default());
        instrument.configure(InstrumentConfig::Health(
            crate::instruments::HealthConfig {
                enabled: false,
                ..Default::default()
            },
        ));
        assert!(instrument.is_ready());
    }
}
