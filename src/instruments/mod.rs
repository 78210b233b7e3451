//! Pluggable operational concerns ("instruments").
//!
//! # Data Flow
//! ```text
//! ServiceSettings
//!     → factory per kind (seed instrument config)
//!     → configure() merges user-supplied partial configs
//!     → is_ready() gates everything below
//!     → bootstrap() performs global setup (subscriber, providers, clients)
//!     → bootstrap_before() contributes routes/middleware to the app config
//!     → bootstrap_after() wraps the constructed application
//!     → teardown() releases global resources at process shutdown
//! ```
//!
//! An unready instrument contributes nothing: `bootstrap_before` returns an
//! empty config and `bootstrap_after` is the identity. Teardown is safe to
//! call whether or not the instrument ever bootstrapped.

pub mod api_docs;
pub mod cors;
pub mod error_reporting;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod tracing;

use std::fmt;

use crate::bootstrap::Framework;
use crate::console::ConsoleWriter;
use crate::error::BootstrapError;

pub use self::api_docs::{ApiDocsConfig, ApiDocsInstrument};
pub use self::cors::{CorsConfig, CorsInstrument};
pub use self::error_reporting::{ErrorReportingConfig, ErrorReportingInstrument};
pub use self::health::{HealthConfig, HealthInstrument};
pub use self::logging::{LoggingConfig, LoggingInstrument, RequestId, X_REQUEST_ID};
pub use self::metrics::{MetricsConfig, MetricsInstrument};
pub use self::registry::{InstrumentBox, InstrumentFactory};
pub use self::tracing::{TracingConfig, TracingInstrument};

/// Identity tag for one operational concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    Logging,
    Tracing,
    Metrics,
    ErrorReporting,
    Health,
    Cors,
    ApiDocs,
}

impl InstrumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Logging => "logging",
            Self::Tracing => "tracing",
            Self::Metrics => "metrics",
            Self::ErrorReporting => "error-reporting",
            Self::Health => "health",
            Self::Cors => "cors",
            Self::ApiDocs => "api-docs",
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial configuration addressed to one instrument kind.
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentConfig {
    Logging(LoggingConfig),
    Tracing(TracingConfig),
    Metrics(MetricsConfig),
    ErrorReporting(ErrorReportingConfig),
    Health(HealthConfig),
    Cors(CorsConfig),
    ApiDocs(ApiDocsConfig),
}

impl InstrumentConfig {
    /// The kind this partial config addresses.
    pub fn kind(&self) -> InstrumentKind {
        match self {
            Self::Logging(_) => InstrumentKind::Logging,
            Self::Tracing(_) => InstrumentKind::Tracing,
            Self::Metrics(_) => InstrumentKind::Metrics,
            Self::ErrorReporting(_) => InstrumentKind::ErrorReporting,
            Self::Health(_) => InstrumentKind::Health,
            Self::Cors(_) => InstrumentKind::Cors,
            Self::ApiDocs(_) => InstrumentKind::ApiDocs,
        }
    }
}

impl From<LoggingConfig> for InstrumentConfig {
    fn from(config: LoggingConfig) -> Self {
        Self::Logging(config)
    }
}

impl From<TracingConfig> for InstrumentConfig {
    fn from(config: TracingConfig) -> Self {
        Self::Tracing(config)
    }
}

impl From<MetricsConfig> for InstrumentConfig {
    fn from(config: MetricsConfig) -> Self {
        Self::Metrics(config)
    }
}

impl From<ErrorReportingConfig> for InstrumentConfig {
    fn from(config: ErrorReportingConfig) -> Self {
        Self::ErrorReporting(config)
    }
}

impl From<HealthConfig> for InstrumentConfig {
    fn from(config: HealthConfig) -> Self {
        Self::Health(config)
    }
}

impl From<CorsConfig> for InstrumentConfig {
    fn from(config: CorsConfig) -> Self {
        Self::Cors(config)
    }
}

impl From<ApiDocsConfig> for InstrumentConfig {
    fn from(config: ApiDocsConfig) -> Self {
        Self::ApiDocs(config)
    }
}

/// Capability contract every instrument implements for a target framework.
///
/// The caller (the bootstrapper) guarantees `bootstrap` runs at most once,
/// and only when `is_ready()` holds. Implementations still guard their
/// contribution methods so an unready instrument is inert on its own.
pub trait Instrument<F: Framework>: Send {
    fn kind(&self) -> InstrumentKind;

    /// Merge a partial config into the held config; non-default fields win.
    /// Configs for other kinds are ignored.
    fn configure(&mut self, patch: InstrumentConfig);

    /// Whether the held config is sufficient to activate.
    fn is_ready(&self) -> bool;

    /// Human-readable reason shown when the instrument is not ready.
    fn not_ready_reason(&self) -> &'static str;

    /// Global side-effecting setup. Call at most once.
    fn bootstrap(&mut self) -> Result<(), BootstrapError> {
        Ok(())
    }

    /// Parts to merge into the application configuration before
    /// construction. Empty when not ready.
    fn bootstrap_before(&mut self) -> F::Config {
        F::Config::default()
    }

    /// Attach to the constructed application. Identity when not ready.
    fn bootstrap_after(&mut self, application: F::Application) -> F::Application {
        application
    }

    /// Release global resources. Safe to call even if never bootstrapped.
    fn teardown(&mut self) {}

    /// Report enabled/disabled status to the console reporter.
    fn write_status(&self, writer: &mut ConsoleWriter) {
        writer.write_instrument(self.kind(), self.is_ready(), self.not_ready_reason());
    }
}
