//! Settings loading from disk and environment.
//!
//! Layering is defaults → file → environment, merged under the
//! non-default-wins rule, then validated as a whole.

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::merge::Merge;
use crate::config::schema::ServiceSettings;
use crate::config::validation::{validate_settings, ValidationError};

/// Error type for settings loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("invalid value in ${name}: {message}")]
    Env { name: &'static str, message: String },
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ServiceSettings {
    /// Load settings from a TOML file, overlay environment variables, and
    /// validate the result.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let file: ServiceSettings = toml::from_str(&content)?;
        let settings = ServiceSettings::default()
            .merge(file)
            .merge(env_overrides()?);
        settings.validate()?;
        Ok(settings)
    }

    /// Build settings from environment variables alone.
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings = ServiceSettings::default().merge(env_overrides()?);
        settings.validate()?;
        Ok(settings)
    }

    /// Run semantic validation on this record.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_settings(self).map_err(ConfigError::Validation)
    }
}

/// Settings record carrying only the fields present in the environment;
/// everything else stays at its default and is inert under the merge.
fn env_overrides() -> Result<ServiceSettings, ConfigError> {
    let mut settings = ServiceSettings::default();

    if let Some(value) = env_var::<String>("SERVICE_NAME")? {
        settings.service_name = value;
    }
    if let Some(value) = env_var::<String>("SERVICE_VERSION")? {
        settings.service_version = value;
    }
    if let Some(value) = env_var::<String>("SERVICE_ENVIRONMENT")? {
        settings.service_environment = Some(value);
    }
    if let Some(value) = env_var::<bool>("SERVICE_DEBUG")? {
        settings.service_debug = value;
    }
    if let Some(value) = env_var::<String>("SERVER_HOST")? {
        settings.server.host = value;
    }
    if let Some(value) = env_var::<u16>("SERVER_PORT")? {
        settings.server.port = value;
    }
    if let Some(value) = env_var::<u64>("REQUEST_TIMEOUT_SECS")? {
        settings.server.request_timeout_secs = value;
    }
    if let Some(value) = env_var::<String>("LOG_LEVEL")? {
        settings.logging.level = value;
    }
    if let Some(value) = env_var::<bool>("JSON_LOGS")? {
        settings.logging.json = value;
    }
    if let Some(value) = env_var::<String>("OTLP_ENDPOINT")? {
        settings.tracing.endpoint = Some(value);
    }
    if let Some(value) = env_var::<f64>("TRACE_SAMPLE_RATIO")? {
        settings.tracing.sample_ratio = value;
    }
    if let Some(value) = env_var::<bool>("METRICS_ENABLED")? {
        settings.metrics.enabled = value;
    }
    if let Some(value) = env_var::<String>("METRICS_PATH")? {
        settings.metrics.path = value;
    }
    if let Some(value) = env_var::<String>("SENTRY_DSN")? {
        settings.error_reporting.sentry_dsn = Some(value);
    }
    if let Some(value) = env_var::<bool>("HEALTH_ENABLED")? {
        settings.health.enabled = value;
    }
    if let Some(value) = env_var::<String>("HEALTH_PATH")? {
        settings.health.path = value;
    }
    if let Some(value) = env_var::<String>("CORS_ALLOW_ORIGINS")? {
        settings.cors.allow_origins = value
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();
    }
    if let Some(value) = env_var::<bool>("API_DOCS_ENABLED")? {
        settings.api_docs.enabled = value;
    }
    if let Some(value) = env_var::<String>("API_DOCS_PATH")? {
        settings.api_docs.path = value;
    }

    Ok(settings)
}

fn env_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.parse::<T>().map(Some).map_err(|error| ConfigError::Env {
            name,
            message: error.to_string(),
        }),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(error) => Err(ConfigError::Env {
            name,
            message: error.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    // env_overrides() reads the whole variable set, so tests that touch the
    // environment must not interleave
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn env_overlay_wins_over_file() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("SENTRY_DSN", "https://key@sentry.example.com/42");
        let file: ServiceSettings = toml::from_str(
            r#"
            service_name = "orders"

            [error_reporting]
            sentry_dsn = "https://other@sentry.example.com/1"
            "#,
        )
        .unwrap();
        let settings = ServiceSettings::default()
            .merge(file)
            .merge(env_overrides().unwrap());
        std::env::remove_var("SENTRY_DSN");

        assert_eq!(settings.service_name, "orders");
        assert_eq!(
            settings.error_reporting.sentry_dsn.as_deref(),
            Some("https://key@sentry.example.com/42")
        );
    }

    #[test]
    fn unparsable_env_value_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("SERVER_PORT", "not-a-port");
        let result = env_overrides();
        std::env::remove_var("SERVER_PORT");
        assert!(matches!(
            result,
            Err(ConfigError::Env { name: "SERVER_PORT", .. })
        ));
    }

    #[test]
    fn origins_split_on_commas() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var(
            "CORS_ALLOW_ORIGINS",
            "https://a.example.com, https://b.example.com",
        );
        let settings = env_overrides().unwrap();
        std::env::remove_var("CORS_ALLOW_ORIGINS");
        assert_eq!(
            settings.cors.allow_origins,
            vec![
                "https://a.example.com".to_string(),
                "https://b.example.com".to_string()
            ]
        );
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = ServiceSettings::load(Path::new("/nonexistent/settings.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
