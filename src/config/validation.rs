//! Settings validation.
//!
//! Semantic checks beyond what deserialization enforces: path shapes,
//! ratio ranges, filter syntax, conflicting CORS options. Validation is a
//! pure function and returns every violation found, not just the first.
//! Checks apply only to instruments that are switched on.

use tracing_subscriber::EnvFilter;

use crate::config::schema::ServiceSettings;

/// One semantic violation in a settings record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must start with '/' (got {value:?})")]
    PathShape { field: &'static str, value: String },

    #[error("{field} must be within 0.0..=1.0 (got {value})")]
    RatioRange { field: &'static str, value: f64 },

    #[error("logging.level {value:?} is not a valid filter directive")]
    LogLevel { value: String },

    #[error("cors.allow_credentials cannot be combined with a wildcard origin")]
    CredentialsWithWildcardOrigin,

    #[error("server.port must be non-zero")]
    ZeroPort,
}

/// Validate a settings record, collecting all violations.
pub fn validate_settings(settings: &ServiceSettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.server.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }

    if settings.logging.enabled && EnvFilter::try_new(&settings.logging.level).is_err() {
        errors.push(ValidationError::LogLevel {
            value: settings.logging.level.clone(),
        });
    }

    let mut paths: Vec<(&'static str, &str)> = Vec::new();
    if settings.metrics.enabled {
        paths.push(("metrics.path", &settings.metrics.path));
    }
    if settings.health.enabled {
        paths.push(("health.path", &settings.health.path));
    }
    if settings.api_docs.enabled {
        paths.push(("api_docs.path", &settings.api_docs.path));
        paths.push(("api_docs.spec_path", &settings.api_docs.spec_path));
    }
    for (field, value) in paths {
        if !value.starts_with('/') {
            errors.push(ValidationError::PathShape {
                field,
                value: value.to_string(),
            });
        }
    }

    if !(0.0..=1.0).contains(&settings.tracing.sample_ratio) {
        errors.push(ValidationError::RatioRange {
            field: "tracing.sample_ratio",
            value: settings.tracing.sample_ratio,
        });
    }

    let sentry_rate = f64::from(settings.error_reporting.traces_sample_rate);
    if !(0.0..=1.0).contains(&sentry_rate) {
        errors.push(ValidationError::RatioRange {
            field: "error_reporting.traces_sample_rate",
            value: sentry_rate,
        });
    }

    if settings.cors.allow_credentials
        && settings.cors.allow_origins.iter().any(|origin| origin == "*")
    {
        errors.push(ValidationError::CredentialsWithWildcardOrigin);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
