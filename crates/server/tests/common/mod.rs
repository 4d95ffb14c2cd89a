//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock converter injected, enabling end-to-end API testing
//! without LibreOffice, ImageMagick, Ghostscript or Tesseract installed.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use filemill_core::{
    converter::ToolStatus,
    testing::MockConverter,
    ConversionOrchestrator, ToolAvailability, ToolKind,
};

/// Re-export fixtures for test convenience
pub use filemill_core::testing::fixtures;

/// Test fixture for API testing with a mock converter.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_conversion() {
///     let fixture = TestFixture::new().await;
///     let source = fixture.source("a.docx", b"docx");
///
///     let response = fixture.post("/api/v1/convert", json!({
///         "source_path": source,
///         "source_format": "docx",
///         "target_format": "pdf"
///     })).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock converter - control durations and failures
    pub converter: Arc<MockConverter>,
    /// Orchestrator behind the router
    pub orchestrator: Arc<ConversionOrchestrator>,
    /// Temporary directory for sources, cache and work files
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default settings.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = fixtures::test_config(temp_dir.path());
        config.server.host = std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST);
        if let Some(max) = test_config.max_concurrent_tasks {
            config.processor.max_concurrent_tasks = max;
        }
        config.cache.enabled = !test_config.disable_cache;

        let converter = Arc::new(MockConverter::new());
        let orchestrator = Arc::new(
            ConversionOrchestrator::new(&config, converter.clone())
                .await
                .expect("Failed to create orchestrator"),
        );

        let tools = ToolAvailability {
            tools: ToolKind::ALL
                .iter()
                .map(|&tool| ToolStatus {
                    tool,
                    path: PathBuf::from(tool.name()),
                    available: !test_config.missing_tools.contains(&tool),
                    version: Some("1.0".to_string()),
                })
                .collect(),
        };

        let state = Arc::new(filemill_server::state::AppState::new(
            config,
            Arc::clone(&orchestrator),
            tools,
            filemill_server::api::WsBroadcaster::default(),
        ));

        // Create router
        let router = filemill_server::api::create_router(state);

        Self {
            router,
            converter,
            orchestrator,
            temp_dir,
        }
    }

    /// Write a source file into the fixture directory.
    pub fn source(&self, name: &str, contents: &[u8]) -> PathBuf {
        fixtures::source_file(self.temp_dir.path(), name, contents)
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a GET request and return the raw body as text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Override the queue's concurrency cap
    pub max_concurrent_tasks: Option<usize>,
    /// Run without the cache
    pub disable_cache: bool,
    /// Tools reported as missing by the health endpoint
    pub missing_tools: Vec<ToolKind>,
}

impl TestConfig {
    /// Create config with a single processing slot.
    pub fn single_slot() -> Self {
        Self {
            max_concurrent_tasks: Some(1),
            ..Default::default()
        }
    }

    /// Create config with the given tools missing.
    pub fn with_missing_tools(tools: Vec<ToolKind>) -> Self {
        Self {
            missing_tools: tools,
            ..Default::default()
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
