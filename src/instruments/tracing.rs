//! Tracing instrument (OpenTelemetry).
//!
//! Builds the OTLP span exporter and tracer provider, installs it
//! globally, and contributes a per-request server-span middleware. The
//! provider is shut down (flushing pending spans) on teardown.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{MatchedPath, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use opentelemetry::trace::{Span, SpanKind, Status, Tracer};
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use serde::{Deserialize, Serialize};

use crate::bootstrap::axum::{AxumAppConfig, AxumFramework};
use crate::config::merge::{merge_field, Merge};
use crate::config::ServiceSettings;
use crate::error::BootstrapError;

use super::{Instrument, InstrumentConfig, InstrumentKind};

/// Tracer name used for request spans.
const TRACER_NAME: &str = "wireup";

/// Tracing options. The service identity fields are seeded from the
/// settings object when left empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// OTLP span exporter endpoint; tracing stays off without one.
    pub endpoint: Option<String>,
    /// Ratio of traces sampled, within 0.0..=1.0.
    pub sample_ratio: f64,
    /// Span export timeout in seconds.
    pub export_timeout_secs: u64,
    /// Paths excluded from span creation.
    pub exclude_paths: Vec<String>,
    /// Reported service name.
    pub service_name: String,
    /// Reported service version.
    pub service_version: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            sample_ratio: 1.0,
            export_timeout_secs: 5,
            exclude_paths: vec!["/health".to_string(), "/metrics".to_string()],
            service_name: String::new(),
            service_version: String::new(),
        }
    }
}

impl Merge for TracingConfig {
    fn merge(self, patch: Self) -> Self {
        let defaults = Self::default();
        Self {
            endpoint: merge_field(self.endpoint, patch.endpoint, &defaults.endpoint),
            sample_ratio: merge_field(self.sample_ratio, patch.sample_ratio, &defaults.sample_ratio),
            export_timeout_secs: merge_field(
                self.export_timeout_secs,
                patch.export_timeout_secs,
                &defaults.export_timeout_secs,
            ),
            exclude_paths: merge_field(
                self.exclude_paths,
                patch.exclude_paths,
                &defaults.exclude_paths,
            ),
            service_name: merge_field(self.service_name, patch.service_name, &defaults.service_name),
            service_version: merge_field(
                self.service_version,
                patch.service_version,
                &defaults.service_version,
            ),
        }
    }
}

pub struct TracingInstrument {
    config: TracingConfig,
    provider: Option<SdkTracerProvider>,
}

impl TracingInstrument {
    pub fn new(config: TracingConfig) -> Self {
        Self {
            config,
            provider: None,
        }
    }
}

/// Factory registered for the axum framework.
pub fn factory(settings: &ServiceSettings) -> Box<dyn Instrument<AxumFramework>> {
    let mut config = settings.tracing.clone();
    if config.service_name.is_empty() {
        config.service_name = settings.service_name.clone();
    }
    if config.service_version.is_empty() {
        config.service_version = settings.service_version.clone();
    }
    Box::new(TracingInstrument::new(config))
}

impl Instrument<AxumFramework> for TracingInstrument {
    fn kind(&self) -> InstrumentKind {
        InstrumentKind::Tracing
    }

    fn configure(&mut self, patch: InstrumentConfig) {
        if let InstrumentConfig::Tracing(patch) = patch {
            self.config = std::mem::take(&mut self.config).merge(patch);
        }
    }

    fn is_ready(&self) -> bool {
        self.config
            .endpoint
            .as_deref()
            .is_some_and(|endpoint| !endpoint.is_empty())
    }

    fn not_ready_reason(&self) -> &'static str {
        "OTLP endpoint is not configured"
    }

    fn bootstrap(&mut self) -> Result<(), BootstrapError> {
        let endpoint = match self.config.endpoint.as_deref() {
            Some(endpoint) if !endpoint.is_empty() => endpoint.to_string(),
            _ => return Ok(()),
        };

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .with_timeout(Duration::from_secs(self.config.export_timeout_secs))
            .build()
            .map_err(|error| BootstrapError::instrument(InstrumentKind::Tracing, error))?;

        let resource = Resource::builder()
            .with_attributes([
                KeyValue::new("service.name", self.config.service_name.clone()),
                KeyValue::new("service.version", self.config.service_version.clone()),
            ])
            .build();

        let provider = SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_sampler(Sampler::TraceIdRatioBased(self.config.sample_ratio))
            .with_resource(resource)
            .build();

        global::set_tracer_provider(provider.clone());
        self.provider = Some(provider);
        Ok(())
    }

    fn bootstrap_before(&mut self) -> AxumAppConfig {
        if !self.is_ready() {
            return AxumAppConfig::default();
        }
        let exclude: Arc<[String]> = self.config.exclude_paths.clone().into();
        AxumAppConfig::default().with_layer(move |router: Router| {
            router.layer(middleware::from_fn(move |request: Request, next: Next| {
                let exclude = Arc::clone(&exclude);
                async move { trace_request(exclude, request, next).await }
            }))
        })
    }

    fn teardown(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(error) = provider.shutdown() {
                tracing::warn!(%error, "failed to shut down tracer provider");
            }
        }
    }
}

/// Wrap one request in a server span; the span name is the matched route
/// so cardinality stays bounded.
async fn trace_request(exclude: Arc<[String]>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if exclude.iter().any(|excluded| excluded == &path) {
        return next.run(request).await;
    }

    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| path.clone());

    let tracer = global::tracer(TRACER_NAME);
    let mut span = tracer
        .span_builder(format!("{method} {route}"))
        .with_kind(SpanKind::Server)
        .with_attributes([
            KeyValue::new("http.request.method", method),
            KeyValue::new("url.path", path),
            KeyValue::new("http.route", route),
        ])
        .start(&tracer);

    let response = next.run(request).await;

    let status = response.status();
    span.set_attribute(KeyValue::new(
        "http.response.status_code",
        i64::from(status.as_u16()),
    ));
    if status.is_server_error() {
        span.set_status(Status::error(status.to_string()));
    }
    span.end();
    response
}
