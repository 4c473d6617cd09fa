//! Shared test fixture: an in-process server over a temp database.

// Each test binary uses a different subset of the helpers.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use orderflow_core::{Config, OrderStore, SlaConfig, SlaScheduler, SqliteOrderStore, TickProcessor};
use orderflow_server::api::create_router;
use orderflow_server::state::AppState;

pub struct TestFixture {
    pub router: Router,
    pub store: Arc<dyn OrderStore>,
    pub scheduler: Arc<SlaScheduler>,
    _temp_dir: TempDir,
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Fixture with the periodic timer disabled; ticks only run when
    /// triggered through the API.
    pub fn new() -> Self {
        Self::with_timer_config(SlaConfig {
            enabled: false,
            ..SlaConfig::default()
        })
    }

    pub fn with_timer_config(timer: SlaConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let mut config = Config::default();
        config.database.path = db_path.clone();
        config.timer = timer;

        let store: Arc<dyn OrderStore> =
            Arc::new(SqliteOrderStore::new(&db_path).expect("Failed to create store"));
        let processor = Arc::new(TickProcessor::new(Arc::clone(&store), config.timer.clone()));
        let scheduler = Arc::new(SlaScheduler::new(processor));

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&store),
            Arc::clone(&scheduler),
        ));
        let router = create_router(state);

        Self {
            router,
            store,
            scheduler,
            _temp_dir: temp_dir,
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder().method(method).uri(path);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        TestResponse { status, body }
    }

    /// Register an area and return its ID.
    pub async fn create_area(&self, name: &str) -> String {
        let response = self
            .post(
                "/api/v1/areas",
                json!({ "name": name, "owner": "owner" }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["id"].as_str().unwrap().to_string()
    }

    /// Create an order and return its ID.
    pub async fn create_order(&self, title: &str) -> String {
        let response = self
            .post(
                "/api/v1/orders",
                json!({
                    "title": title,
                    "description": "integration test order",
                    "created_by": "ana"
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["id"].as_str().unwrap().to_string()
    }
}
