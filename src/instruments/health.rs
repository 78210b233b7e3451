//! Health-check instrument.
//!
//! Contributes a route reporting service liveness plus identity, for
//! load balancers and orchestration probes.

use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::bootstrap::axum::{AxumAppConfig, AxumFramework};
use crate::config::merge::{merge_field, Merge};
use crate::config::ServiceSettings;

use super::{Instrument, InstrumentConfig, InstrumentKind};

/// Health-check options. Service identity is seeded from the settings
/// object when left empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Master switch for the health instrument.
    pub enabled: bool,
    /// Path of the health endpoint.
    pub path: String,
    /// Service name reported in the response body.
    pub service_name: String,
    /// Service version reported in the response body.
    pub service_version: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/health".to_string(),
            service_name: String::new(),
            service_version: String::new(),
        }
    }
}

impl Merge for HealthConfig {
    fn merge(self, patch: Self) -> Self {
        let defaults = Self::default();
        Self {
            enabled: merge_field(self.enabled, patch.enabled, &defaults.enabled),
            path: merge_field(self.path, patch.path, &defaults.path),
            service_name: merge_field(self.service_name, patch.service_name, &defaults.service_name),
            service_version: merge_field(
                self.service_version,
                patch.service_version,
                &defaults.service_version,
            ),
        }
    }
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: String,
    version: String,
}

pub struct HealthInstrument {
    config: HealthConfig,
}

impl HealthInstrument {
    pub fn new(config: HealthConfig) -> Self {
        Self { config }
    }
}

/// Factory registered for the axum framework.
pub fn factory(settings: &ServiceSettings) -> Box<dyn Instrument<AxumFramework>> {
    let mut config = settings.health.clone();
    if config.service_name.is_empty() {
        config.service_name = settings.service_name.clone();
    }
    if config.service_version.is_empty() {
        config.service_version = settings.service_version.clone();
    }
    Box::new(HealthInstrument::new(config))
}

impl Instrument<AxumFramework> for HealthInstrument {
    fn kind(&self) -> InstrumentKind {
        InstrumentKind::Health
    }

    fn configure(&mut self, patch: InstrumentConfig) {
        if let InstrumentConfig::Health(patch) = patch {
            self.config = std::mem::take(&mut self.config).merge(patch);
        }
    }

    fn is_ready(&self) -> bool {
        self.config.enabled && !self.config.path.is_empty()
    }

    fn not_ready_reason(&self) -> &'static str {
        "health endpoint is disabled"
    }

    fn bootstrap_before(&mut self) -> AxumAppConfig {
        if !self.is_ready() {
            return AxumAppConfig::default();
        }
        let service = self.config.service_name.clone();
        let version = self.config.service_version.clone();
        let route = Router::new().route(
            &self.config.path,
            get(move || {
                let service = service.clone();
                let version = version.clone();
                async move {
                    Json(HealthResponse {
                        status: "healthy",
                        service,
                        version,
                    })
                }
            }),
        );
        AxumAppConfig::default().with_router(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_by_default() {
        let instrument = HealthInstrument::new(HealthConfig::default());
        assert!(instrument.is_ready());
    }

    #[test]
    fn disabled_contributes_nothing() {
        let mut instrument = HealthInstrument::new(HealthConfig {
            enabled: false,
            ..HealthConfig::default()
        });
        assert!(!instrument.is_ready());
        assert!(instrument.bootstrap_before().routers.is_empty());
    }

    #[test]
    fn ready_contributes_one_route() {
        let mut instrument = HealthInstrument::new(HealthConfig {
            service_name: "orders".to_string(),
            service_version: "1.0.0".to_string(),
            ..HealthConfig::default()
        });
        let contribution = instrument.bootstrap_before();
        assert_eq!(contribution.routers.len(), 1);
        assert!(contribution.layers.is_empty());
    }
}
