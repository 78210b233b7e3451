//! CORS instrument.
//!
//! Builds a `tower_http::cors::CorsLayer` from the configured origin,
//! method, and header lists, and wraps the finished application so
//! preflight handling sits outside every route and middleware.

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer, ExposeHeaders};

use crate::bootstrap::axum::AxumFramework;
use crate::config::merge::{merge_field, Merge};
use crate::config::ServiceSettings;

use super::{Instrument, InstrumentConfig, InstrumentKind};

/// CORS options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins; `"*"` allows any. CORS stays off with no origins.
    pub allow_origins: Vec<String>,
    /// Allowed methods; empty means any.
    pub allow_methods: Vec<String>,
    /// Allowed request headers; empty means any.
    pub allow_headers: Vec<String>,
    /// Response headers exposed to the browser.
    pub expose_headers: Vec<String>,
    /// Allow credentialed requests. Incompatible with a wildcard origin.
    pub allow_credentials: bool,
    /// Preflight cache lifetime in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: Vec::new(),
            allow_methods: Vec::new(),
            allow_headers: Vec::new(),
            expose_headers: Vec::new(),
            allow_credentials: false,
            max_age_secs: 3600,
        }
    }
}

impl Merge for CorsConfig {
    fn merge(self, patch: Self) -> Self {
        let defaults = Self::default();
        Self {
            allow_origins: merge_field(self.allow_origins, patch.allow_origins, &defaults.allow_origins),
            allow_methods: merge_field(self.allow_methods, patch.allow_methods, &defaults.allow_methods),
            allow_headers: merge_field(self.allow_headers, patch.allow_headers, &defaults.allow_headers),
            expose_headers: merge_field(
                self.expose_headers,
                patch.expose_headers,
                &defaults.expose_headers,
            ),
            allow_credentials: merge_field(
                self.allow_credentials,
                patch.allow_credentials,
                &defaults.allow_credentials,
            ),
            max_age_secs: merge_field(self.max_age_secs, patch.max_age_secs, &defaults.max_age_secs),
        }
    }
}

pub struct CorsInstrument {
    config: CorsConfig,
}

impl CorsInstrument {
    pub fn new(config: CorsConfig) -> Self {
        Self { config }
    }
}

/// Factory registered for the axum framework.
pub fn factory(settings: &ServiceSettings) -> Box<dyn Instrument<AxumFramework>> {
    Box::new(CorsInstrument::new(settings.cors.clone()))
}

impl Instrument<AxumFramework> for CorsInstrument {
    fn kind(&self) -> InstrumentKind {
        InstrumentKind::Cors
    }

    fn configure(&mut self, patch: InstrumentConfig) {
        if let InstrumentConfig::Cors(patch) = patch {
            self.config = std::mem::take(&mut self.config).merge(patch);
        }
    }

    fn is_ready(&self) -> bool {
        !self.config.allow_origins.is_empty()
    }

    fn not_ready_reason(&self) -> &'static str {
        "no allowed origins are configured"
    }

    fn bootstrap_after(&mut self, application: Router) -> Router {
        if !self.is_ready() {
            return application;
        }
        application.layer(build_cors(&self.config))
    }
}

fn build_cors(config: &CorsConfig) -> CorsLayer {
    let wildcard = config.allow_origins.iter().any(|origin| origin == "*");
    // Credentialed requests cannot use literal wildcards; mirroring the
    // request satisfies the browser in that case.
    let mirror = config.allow_credentials;

    let origin = if wildcard {
        if mirror {
            AllowOrigin::mirror_request()
        } else {
            AllowOrigin::any()
        }
    } else {
        AllowOrigin::list(
            config
                .allow_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok()),
        )
    };

    let methods = if config.allow_methods.is_empty() {
        if mirror {
            AllowMethods::mirror_request()
        } else {
            AllowMethods::any()
        }
    } else {
        AllowMethods::list(
            config
                .allow_methods
                .iter()
                .filter_map(|method| method.parse::<Method>().ok()),
        )
    };

    let headers = if config.allow_headers.is_empty() {
        if mirror {
            AllowHeaders::mirror_request()
        } else {
            AllowHeaders::any()
        }
    } else {
        AllowHeaders::list(
            config
                .allow_headers
                .iter()
                .filter_map(|header| header.parse::<HeaderName>().ok()),
        )
    };

    let mut cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(config.allow_credentials)
        .max_age(Duration::from_secs(config.max_age_secs));

    if !config.expose_headers.is_empty() {
        cors = cors.expose_headers(ExposeHeaders::list(
            config
                .expose_headers
                .iter()
                .filter_map(|header| header.parse::<HeaderName>().ok()),
        ));
    }
    cors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_ready_without_origins() {
        let instrument = CorsInstrument::new(CorsConfig::default());
        assert!(!instrument.is_ready());
    }

    #[test]
    fn ready_with_origin() {
        let instrument = CorsInstrument::new(CorsConfig {
            allow_origins: vec!["https://app.example.com".to_string()],
            ..CorsConfig::default()
        });
        assert!(instrument.is_ready());
    }

    #[test]
    fn unready_leaves_application_unchanged() {
        let mut instrument = CorsInstrument::new(CorsConfig::default());
        // identity attachment: the call must not panic or wrap anything
        let _router = instrument.bootstrap_after(Router::new());
    }

    #[test]
    fn merge_keeps_origins_on_default_patch() {
        let set = CorsConfig {
            allow_origins: vec!["https://app.example.com".to_string()],
            ..CorsConfig::default()
        };
        let merged = set.merge(CorsConfig {
            max_age_secs: 600,
            ..CorsConfig::default()
        });
        assert_eq!(merged.allow_origins.len(), 1);
        assert_eq!(merged.max_age_secs, 600);
    }
}
