//! Declarative observability and middleware bootstrap for axum applications.
//!
//! Turns a settings record into a wired application: logging, tracing,
//! metrics, error reporting, health checks, CORS, and API docs are each a
//! pluggable *instrument* with a uniform lifecycle, driven by a generic
//! bootstrapper.
//!
//! # Architecture Overview
//!
//! ```text
//!   ServiceSettings (file / env / literal)
//!        │
//!        ▼
//!   ┌─────────────────────────────────────────────────┐
//!   │            ApplicationBootstrapper              │
//!   │                                                 │
//!   │  ┌───────────┐   configure_instrument(s)        │
//!   │  │ Instrument│◀──────────────────────────       │
//!   │  │   Box     │                                  │
//!   │  └─────┬─────┘                                  │
//!   │        │ per ready instrument, in order:        │
//!   │        │   bootstrap() + bootstrap_before()     │
//!   │        ▼                                        │
//!   │  AxumAppConfig ── F::build ──▶ axum::Router     │
//!   │        │                          │             │
//!   │        └── bootstrap_after(app) ◀─┘             │
//!   └─────────────────────────────────────────────────┘
//!        │
//!        ▼
//!   (Router, TeardownHandle)     TeardownHandle::teardown() at shutdown
//! ```
//!
//! # Example
//!
//! ```no_run
//! use wireup::{AxumBootstrapper, ServiceSettings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = ServiceSettings::from_env()?;
//!     let bind_address = settings.bind_address();
//!
//!     let (app, teardown) = AxumBootstrapper::new(settings).bootstrap()?;
//!
//!     let listener = tokio::net::TcpListener::bind(bind_address).await?;
//!     axum::serve(listener, app).await?;
//!
//!     teardown.teardown();
//!     Ok(())
//! }
//! ```

pub mod bootstrap;
pub mod config;
pub mod console;
pub mod error;
pub mod instruments;

pub use bootstrap::axum::{AxumAppConfig, AxumBootstrapper, AxumFramework, RouterHook};
pub use bootstrap::{
    ApplicationBootstrapper, ApplicationConfig, BootstrapSettings, Framework, TeardownHandle,
};
pub use config::{ConfigError, Merge, ServerSettings, ServiceSettings, ValidationError};
pub use console::ConsoleWriter;
pub use error::BootstrapError;
pub use instruments::{
    ApiDocsConfig, CorsConfig, ErrorReportingConfig, HealthConfig, Instrument, InstrumentBox,
    InstrumentConfig, InstrumentFactory, InstrumentKind, LoggingConfig, MetricsConfig,
    TracingConfig,
};
