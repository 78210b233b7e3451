//! Error-reporting instrument (Sentry).
//!
//! Initializes the Sentry client from the configured DSN and wraps the
//! finished application in the Sentry tower layers: a per-request hub
//! scope outermost, HTTP transaction capture inside it. The client guard
//! is held until teardown, which flushes pending events.

use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use sentry::integrations::tower::{NewSentryLayer, SentryHttpLayer};
use sentry::{ClientInitGuard, ClientOptions};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::bootstrap::axum::AxumFramework;
use crate::config::merge::{merge_field, Merge};
use crate::config::ServiceSettings;
use crate::error::BootstrapError;

use super::{Instrument, InstrumentConfig, InstrumentKind};

/// How long teardown waits for pending events to flush.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Error-reporting options. Release and environment are seeded from the
/// settings object when left unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorReportingConfig {
    /// Sentry DSN; error reporting stays off without one.
    pub sentry_dsn: Option<String>,
    /// Deployment environment reported with each event.
    pub environment: Option<String>,
    /// Release identifier reported with each event.
    pub release: Option<String>,
    /// Ratio of transactions sampled for performance monitoring.
    pub traces_sample_rate: f32,
    /// Attach stacktraces to captured messages.
    pub attach_stacktrace: bool,
    /// Send personally identifiable request data.
    pub send_default_pii: bool,
}

impl Default for ErrorReportingConfig {
    fn default() -> Self {
        Self {
            sentry_dsn: None,
            environment: None,
            release: None,
            traces_sample_rate: 1.0,
            attach_stacktrace: true,
            send_default_pii: false,
        }
    }
}

impl Merge for ErrorReportingConfig {
    fn merge(self, patch: Self) -> Self {
        let defaults = Self::default();
        Self {
            sentry_dsn: merge_field(self.sentry_dsn, patch.sentry_dsn, &defaults.sentry_dsn),
            environment: merge_field(self.environment, patch.environment, &defaults.environment),
            release: merge_field(self.release, patch.release, &defaults.release),
            traces_sample_rate: merge_field(
                self.traces_sample_rate,
                patch.traces_sample_rate,
                &defaults.traces_sample_rate,
            ),
            attach_stacktrace: merge_field(
                self.attach_stacktrace,
                patch.attach_stacktrace,
                &defaults.attach_stacktrace,
            ),
            send_default_pii: merge_field(
                self.send_default_pii,
                patch.send_default_pii,
                &defaults.send_default_pii,
            ),
        }
    }
}

pub struct ErrorReportingInstrument {
    config: ErrorReportingConfig,
    guard: Option<ClientInitGuard>,
}

impl ErrorReportingInstrument {
    pub fn new(config: ErrorReportingConfig) -> Self {
        Self {
            config,
            guard: None,
        }
    }
}

/// Factory registered for the axum framework.
pub fn factory(settings: &ServiceSettings) -> Box<dyn Instrument<AxumFramework>> {
    let mut config = settings.error_reporting.clone();
    if config.environment.is_none() {
        config.environment = settings.service_environment.clone();
    }
    if config.release.is_none() {
        config.release = Some(format!(
            "{}@{}",
            settings.service_name, settings.service_version
        ));
    }
    Box::new(ErrorReportingInstrument::new(config))
}

impl Instrument<AxumFramework> for ErrorReportingInstrument {
    fn kind(&self) -> InstrumentKind {
        InstrumentKind::ErrorReporting
    }

    fn configure(&mut self, patch: InstrumentConfig) {
        if let InstrumentConfig::ErrorReporting(patch) = patch {
            self.config = std::mem::take(&mut self.config).merge(patch);
        }
    }

    fn is_ready(&self) -> bool {
        self.config
            .sentry_dsn
            .as_deref()
            .is_some_and(|dsn| !dsn.is_empty())
    }

    fn not_ready_reason(&self) -> &'static str {
        "Sentry DSN is not configured"
    }

    fn bootstrap(&mut self) -> Result<(), BootstrapError> {
        let raw_dsn = match self.config.sentry_dsn.as_deref() {
            Some(dsn) if !dsn.is_empty() => dsn,
            _ => return Ok(()),
        };
        let dsn = raw_dsn
            .parse::<sentry::types::Dsn>()
            .map_err(|error| BootstrapError::instrument(InstrumentKind::ErrorReporting, error))?;

        let guard = sentry::init(ClientOptions {
            dsn: Some(dsn),
            release: self.config.release.clone().map(Into::into),
            environment: self.config.environment.clone().map(Into::into),
            traces_sample_rate: self.config.traces_sample_rate,
            attach_stacktrace: self.config.attach_stacktrace,
            send_default_pii: self.config.send_default_pii,
            ..Default::default()
        });
        if !guard.is_enabled() {
            warn!("Sentry DSN provided but client not enabled");
        }
        self.guard = Some(guard);
        Ok(())
    }

    fn bootstrap_after(&mut self, application: Router) -> Router {
        if !self.is_ready() {
            return application;
        }
        application
            .layer(SentryHttpLayer::with_transaction())
            .layer(NewSentryLayer::<Request<Body>>::new_from_top())
    }

    fn teardown(&mut self) {
        if let Some(guard) = self.guard.take() {
            guard.flush(Some(FLUSH_TIMEOUT));
            drop(guard);
        }
    }
}
