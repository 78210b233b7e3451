//! End-to-end bootstrap tests.
//!
//! Router-level assertions go through `tower::ServiceExt::oneshot`; one
//! test serves the bootstrapped application over a real socket the way a
//! deployment would.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use tower::ServiceExt;
use wireup::{
    AxumBootstrapper, ConsoleWriter, CorsConfig, ErrorReportingConfig, HealthConfig,
    InstrumentBox, InstrumentConfig, ServiceSettings,
};

/// Settings that keep the global tracing subscriber untouched so tests
/// stay independent of each other.
fn quiet_settings() -> ServiceSettings {
    let mut settings = ServiceSettings::default();
    settings.service_name = "wireup-test".to_string();
    settings.service_version = "0.0.0-test".to_string();
    settings.logging.enabled = false;
    settings
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn default_bootstrap_serves_health_metrics_and_docs() {
    let (app, teardown) = AxumBootstrapper::new(quiet_settings()).bootstrap().unwrap();

    let health = app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    let body = body_json(health).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "wireup-test");
    assert_eq!(body["version"], "0.0.0-test");

    let metrics = app
        .clone()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(metrics.status(), StatusCode::OK);

    let spec = app
        .clone()
        .oneshot(Request::get("/openapi.json").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(spec.status(), StatusCode::OK);
    let spec_body = body_json(spec).await;
    assert_eq!(spec_body["info"]["title"], "wireup-test");

    let docs = app
        .clone()
        .oneshot(Request::get("/docs").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(docs.status(), StatusCode::OK);

    let missing = app
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    teardown.teardown();
}

#[tokio::test]
async fn status_lines_follow_registration_order() {
    let buf = SharedBuf::default();
    let writer = ConsoleWriter::with_output(true, Box::new(buf.clone()));

    let (_app, teardown) = AxumBootstrapper::new(quiet_settings())
        .with_console_writer(writer)
        .bootstrap()
        .unwrap();

    let output = buf.contents();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 7);
    let order: Vec<&str> = lines
        .iter()
        .map(|line| line.split_whitespace().next().unwrap())
        .collect();
    assert_eq!(
        order,
        vec![
            "logging",
            "tracing",
            "metrics",
            "error-reporting",
            "health",
            "cors",
            "api-docs"
        ]
    );
    // unready instruments still report, with a reason
    assert!(lines[0].contains("disabled (logging is disabled)"));
    assert!(lines[1].contains("disabled (OTLP endpoint is not configured)"));
    assert!(lines[3].contains("disabled (Sentry DSN is not configured)"));
    assert!(lines[4].ends_with("enabled"));

    teardown.teardown();
}

#[tokio::test]
async fn configured_instrument_overrides_defaults() {
    let (app, teardown) = AxumBootstrapper::new(quiet_settings())
        .configure_instrument(HealthConfig {
            path: "/live".to_string(),
            ..HealthConfig::default()
        })
        .bootstrap()
        .unwrap();

    let live = app
        .clone()
        .oneshot(Request::get("/live").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(live.status(), StatusCode::OK);
    // the seeded service identity survives the defaulted patch fields
    let body = body_json(live).await;
    assert_eq!(body["service"], "wireup-test");

    let old = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(old.status(), StatusCode::NOT_FOUND);

    teardown.teardown();
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin() {
    let (app, teardown) = AxumBootstrapper::new(quiet_settings())
        .configure_instrument(CorsConfig {
            allow_origins: vec!["https://app.example.com".to_string()],
            ..CorsConfig::default()
        })
        .bootstrap()
        .unwrap();

    let preflight = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/health")
                .header(header::ORIGIN, "https://app.example.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(preflight.status(), StatusCode::OK);
    assert_eq!(
        preflight
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|value| value.to_str().ok()),
        Some("https://app.example.com")
    );

    teardown.teardown();
}

#[tokio::test]
async fn sentry_instrument_bootstraps_and_tears_down() {
    let (app, teardown) = AxumBootstrapper::new(quiet_settings())
        .configure_instruments([InstrumentConfig::ErrorReporting(ErrorReportingConfig {
            sentry_dsn: Some("https://examplePublicKey@o0.ingest.sentry.io/0".to_string()),
            ..ErrorReportingConfig::default()
        })])
        .bootstrap()
        .unwrap();

    // the wrapped application still serves traffic
    let health = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    teardown.teardown();
}

#[tokio::test]
async fn empty_instrument_box_still_builds() {
    let bootstrapper =
        AxumBootstrapper::from_parts(quiet_settings(), InstrumentBox::empty());
    let (app, teardown) = bootstrapper.bootstrap().unwrap();

    // no instruments: no routes, but the framework timeout layer is live
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    teardown.teardown();
}

#[tokio::test]
async fn served_application_round_trip() {
    let mut settings = quiet_settings();
    settings.logging.enabled = true;

    let (app, teardown) = AxumBootstrapper::new(settings).bootstrap().unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let response = client
        .get(format!("http://{address}/health"))
        .send()
        .await
        .expect("bootstrapped server unreachable");

    assert_eq!(response.status(), 200);
    // the logging instrument's request-id middleware echoes an id
    assert!(response.headers().contains_key("x-request-id"));
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");

    server.abort();
    teardown.teardown();
}
