//! Metrics instrument (Prometheus).
//!
//! # Metrics Emitted
//! - `http_requests_total` (counter): requests by method, path, status
//! - `http_request_duration_seconds` (histogram): latency distribution
//!
//! Path labels use the matched route, not the raw URI, so dynamic
//! segments cannot explode label cardinality; unmatched requests are
//! bucketed as `/*`.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bootstrap::axum::{AxumAppConfig, AxumFramework};
use crate::config::merge::{merge_field, Merge};
use crate::config::ServiceSettings;
use crate::error::BootstrapError;

use super::{Instrument, InstrumentConfig, InstrumentKind};

/// Metrics options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Master switch for the metrics instrument.
    pub enabled: bool,
    /// Path of the Prometheus exposition endpoint.
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

impl Merge for MetricsConfig {
    fn merge(self, patch: Self) -> Self {
        let defaults = Self::default();
        Self {
            enabled: merge_field(self.enabled, patch.enabled, &defaults.enabled),
            path: merge_field(self.path, patch.path, &defaults.path),
        }
    }
}

pub struct MetricsInstrument {
    config: MetricsConfig,
    handle: Option<PrometheusHandle>,
}

impl MetricsInstrument {
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            config,
            handle: None,
        }
    }
}

/// Factory registered for the axum framework.
pub fn factory(settings: &ServiceSettings) -> Box<dyn Instrument<AxumFramework>> {
    Box::new(MetricsInstrument::new(settings.metrics.clone()))
}

impl Instrument<AxumFramework> for MetricsInstrument {
    fn kind(&self) -> InstrumentKind {
        InstrumentKind::Metrics
    }

    fn configure(&mut self, patch: InstrumentConfig) {
        if let InstrumentConfig::Metrics(patch) = patch {
            self.config = std::mem::take(&mut self.config).merge(patch);
        }
    }

    fn is_ready(&self) -> bool {
        self.config.enabled && !self.config.path.is_empty()
    }

    fn not_ready_reason(&self) -> &'static str {
        "metrics endpoint is disabled"
    }

    fn bootstrap(&mut self) -> Result<(), BootstrapError> {
        let recorder = PrometheusBuilder::new().build_recorder();
        self.handle = Some(recorder.handle());
        // The exposition handle renders this recorder's registry either
        // way; only the macro side needs the global slot, which may
        // already be taken when several bootstrappers share a process.
        if metrics::set_global_recorder(recorder).is_err() {
            debug!("global metrics recorder already installed, keeping the existing one");
        }
        Ok(())
    }

    fn bootstrap_before(&mut self) -> AxumAppConfig {
        if !self.is_ready() {
            return AxumAppConfig::default();
        }
        let Some(handle) = self.handle.clone() else {
            return AxumAppConfig::default();
        };
        let exposition = Router::new().route(
            &self.config.path,
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        );
        AxumAppConfig::default()
            .with_router(exposition)
            .with_layer(|router: Router| {
                router.layer(middleware::from_fn(record_request_metrics))
            })
    }
}

async fn record_request_metrics(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| "/*".to_string());

    let start = Instant::now();
    let response = next.run(request).await;

    let labels = [
        ("method", method),
        ("path", path),
        ("status", response.status().as_u16().to_string()),
    ];
    metrics::counter!("http_requests_total", &labels).increment(1);
    metrics::histogram!("http_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_by_default() {
        let instrument = MetricsInstrument::new(MetricsConfig::default());
        assert!(instrument.is_ready());
    }

    #[test]
    fn disabled_contributes_nothing() {
        let mut instrument = MetricsInstrument::new(MetricsConfig {
            enabled: false,
            ..MetricsConfig::default()
        });
        assert!(!instrument.is_ready());
        let contribution = instrument.bootstrap_before();
        assert!(contribution.routers.is_empty());
        assert!(contribution.layers.is_empty());
    }

    #[test]
    fn exposition_route_requires_bootstrap() {
        // readiness alone is not enough: without bootstrap there is no
        // recorder handle to render from
        let mut instrument = MetricsInstrument::new(MetricsConfig::default());
        let contribution = instrument.bootstrap_before();
        assert!(contribution.routers.is_empty());
    }

    #[test]
    fn bootstrap_then_contribute() {
        let mut instrument = MetricsInstrument::new(MetricsConfig::default());
        instrument.bootstrap().unwrap();
        let contribution = instrument.bootstrap_before();
        assert_eq!(contribution.routers.len(), 1);
        assert_eq!(contribution.layers.len(), 1);
    }
}
