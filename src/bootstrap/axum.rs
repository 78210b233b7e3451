//! axum integration.
//!
//! Declares the application-config record the instruments contribute to
//! (`AxumAppConfig`), the framework wiring that folds it into an
//! `axum::Router`, and the ready-to-use [`AxumBootstrapper`] alias.

use std::time::Duration;

use axum::Router;
use tower_http::timeout::TimeoutLayer;

use crate::config::ServiceSettings;
use crate::instruments::{self, InstrumentFactory, InstrumentKind};

use super::{ApplicationBootstrapper, ApplicationConfig, Framework};

/// Deferred router transformation, applied during application assembly.
pub type RouterHook = Box<dyn FnOnce(Router) -> Router + Send>;

/// Parts destined for the application under construction.
#[derive(Default)]
pub struct AxumAppConfig {
    /// Routers merged into the application, in contribution order.
    pub routers: Vec<Router>,
    /// Middleware applications; later entries wrap earlier ones.
    pub layers: Vec<RouterHook>,
}

impl AxumAppConfig {
    /// Add a router to merge into the application.
    #[must_use]
    pub fn with_router(mut self, router: Router) -> Self {
        self.routers.push(router);
        self
    }

    /// Add a deferred middleware application.
    #[must_use]
    pub fn with_layer(mut self, apply: impl FnOnce(Router) -> Router + Send + 'static) -> Self {
        self.layers.push(Box::new(apply));
        self
    }
}

impl ApplicationConfig for AxumAppConfig {
    fn merge_overrides(self, patch: Self) -> Self {
        Self {
            routers: if patch.routers.is_empty() {
                self.routers
            } else {
                patch.routers
            },
            layers: if patch.layers.is_empty() {
                self.layers
            } else {
                patch.layers
            },
        }
    }

    fn merge_contribution(mut self, contribution: Self) -> Self {
        self.routers.extend(contribution.routers);
        self.layers.extend(contribution.layers);
        self
    }
}

/// The axum target: builds an `axum::Router` from the accumulated parts.
pub struct AxumFramework;

impl Framework for AxumFramework {
    type Settings = ServiceSettings;
    type Config = AxumAppConfig;
    type Application = Router;

    fn instruments() -> Vec<InstrumentFactory<Self>> {
        vec![
            InstrumentFactory {
                kind: InstrumentKind::Logging,
                construct: instruments::logging::factory,
            },
            InstrumentFactory {
                kind: InstrumentKind::Tracing,
                construct: instruments::tracing::factory,
            },
            InstrumentFactory {
                kind: InstrumentKind::Metrics,
                construct: instruments::metrics::factory,
            },
            InstrumentFactory {
                kind: InstrumentKind::ErrorReporting,
                construct: instruments::error_reporting::factory,
            },
            InstrumentFactory {
                kind: InstrumentKind::Health,
                construct: instruments::health::factory,
            },
            InstrumentFactory {
                kind: InstrumentKind::Cors,
                construct: instruments::cors::factory,
            },
            InstrumentFactory {
                kind: InstrumentKind::ApiDocs,
                construct: instruments::api_docs::factory,
            },
        ]
    }

    fn build(config: AxumAppConfig) -> Router {
        let mut application = Router::new();
        for router in config.routers {
            application = application.merge(router);
        }
        for apply in config.layers {
            application = apply(application);
        }
        application
    }

    fn bootstrap_before(settings: &ServiceSettings) -> AxumAppConfig {
        let timeout = Duration::from_secs(settings.server.request_timeout_secs);
        AxumAppConfig::default()
            .with_layer(move |router| router.layer(TimeoutLayer::new(timeout)))
    }
}

/// Bootstrapper producing an `axum::Router`.
pub type AxumBootstrapper = ApplicationBootstrapper<AxumFramework>;
