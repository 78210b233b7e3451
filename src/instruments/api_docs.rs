//! API-docs instrument.
//!
//! Serves an OpenAPI document and a Swagger UI page for it. The document
//! skeleton carries the service identity; applications extend it by
//! replacing the spec route with their own.

use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::bootstrap::axum::{AxumAppConfig, AxumFramework};
use crate::config::merge::{merge_field, Merge};
use crate::config::ServiceSettings;

use super::{Instrument, InstrumentConfig, InstrumentKind};

/// API-docs options. Title and version are seeded from the settings
/// object when left empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiDocsConfig {
    /// Master switch for the API-docs instrument.
    pub enabled: bool,
    /// Path of the Swagger UI page.
    pub path: String,
    /// Path of the OpenAPI JSON document.
    pub spec_path: String,
    /// Document title.
    pub title: String,
    /// Document version.
    pub version: String,
}

impl Default for ApiDocsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/docs".to_string(),
            spec_path: "/openapi.json".to_string(),
            title: String::new(),
            version: String::new(),
        }
    }
}

impl Merge for ApiDocsConfig {
    fn merge(self, patch: Self) -> Self {
        let defaults = Self::default();
        Self {
            enabled: merge_field(self.enabled, patch.enabled, &defaults.enabled),
            path: merge_field(self.path, patch.path, &defaults.path),
            spec_path: merge_field(self.spec_path, patch.spec_path, &defaults.spec_path),
            title: merge_field(self.title, patch.title, &defaults.title),
            version: merge_field(self.version, patch.version, &defaults.version),
        }
    }
}

pub struct ApiDocsInstrument {
    config: ApiDocsConfig,
}

impl ApiDocsInstrument {
    pub fn new(config: ApiDocsConfig) -> Self {
        Self { config }
    }
}

/// Factory registered for the axum framework.
pub fn factory(settings: &ServiceSettings) -> Box<dyn Instrument<AxumFramework>> {
    let mut config = settings.api_docs.clone();
    if config.title.is_empty() {
        config.title = settings.service_name.clone();
    }
    if config.version.is_empty() {
        config.version = settings.service_version.clone();
    }
    Box::new(ApiDocsInstrument::new(config))
}

impl Instrument<AxumFramework> for ApiDocsInstrument {
    fn kind(&self) -> InstrumentKind {
        InstrumentKind::ApiDocs
    }

    fn configure(&mut self, patch: InstrumentConfig) {
        if let InstrumentConfig::ApiDocs(patch) = patch {
            self.config = std::mem::take(&mut self.config).merge(patch);
        }
    }

    fn is_ready(&self) -> bool {
        self.config.enabled && !self.config.path.is_empty() && !self.config.spec_path.is_empty()
    }

    fn not_ready_reason(&self) -> &'static str {
        "API docs are disabled"
    }

    fn bootstrap_before(&mut self) -> AxumAppConfig {
        if !self.is_ready() {
            return AxumAppConfig::default();
        }
        let document = serde_json::json!({
            "openapi": "3.0.3",
            "info": {
                "title": self.config.title,
                "version": self.config.version,
            },
            "paths": {},
        });
        let page = swagger_page(&self.config.spec_path, &self.config.title);
        let routes = Router::new()
            .route(
                &self.config.spec_path,
                get(move || {
                    let document = document.clone();
                    async move { Json(document) }
                }),
            )
            .route(
                &self.config.path,
                get(move || {
                    let page = page.clone();
                    async move { Html(page) }
                }),
            );
        AxumAppConfig::default().with_router(routes)
    }
}

fn swagger_page(spec_url: &str, title: &str) -> String {
    format!(
        r##"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title}</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.onload = () => {{
      SwaggerUIBundle({{ url: "{spec_url}", dom_id: "#swagger-ui" }});
    }};
  </script>
</body>
</html>
"##
    )
}
