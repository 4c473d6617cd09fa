//! Integration tests for the order and area endpoints.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::TestFixture;

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new();
    let response = fixture.get("/api/v1/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_create_order_starts_new() {
    let fixture = TestFixture::new();
    let response = fixture
        .post(
            "/api/v1/orders",
            json!({
                "title": "Install rack",
                "description": "New rack in room 4",
                "created_by": "ana",
                "priority": "high"
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["global_state"], "new");
    assert_eq!(response.body["priority"], "high");
    assert!(response.body["id"].as_str().is_some());
}

#[tokio::test]
async fn test_get_missing_order_is_404() {
    let fixture = TestFixture::new();
    let response = fixture.get("/api/v1/orders/no-such-id").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.body["error"]
        .as_str()
        .unwrap()
        .contains("not found"));
}

#[tokio::test]
async fn test_list_orders_filters_and_paginates() {
    let fixture = TestFixture::new();
    for i in 0..3 {
        fixture.create_order(&format!("Order {i}")).await;
    }

    let response = fixture.get("/api/v1/orders?limit=2").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["orders"].as_array().unwrap().len(), 2);
    assert_eq!(response.body["total"], 3);
    assert_eq!(response.body["limit"], 2);

    let response = fixture.get("/api/v1/orders?state=completed").await;
    assert_eq!(response.body["total"], 0);

    let response = fixture.get("/api/v1/orders?state=bogus").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_area_name_conflicts() {
    let fixture = TestFixture::new();
    fixture.create_area("Networking").await;
    let response = fixture
        .post(
            "/api/v1/areas",
            json!({ "name": "Networking", "owner": "bob" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_assign_areas_moves_order_to_assigned() {
    let fixture = TestFixture::new();
    let order = fixture.create_order("Routing check").await;
    let networking = fixture.create_area("Networking").await;
    let facilities = fixture.create_area("Facilities").await;

    let response = fixture
        .post(
            &format!("/api/v1/orders/{order}/areas"),
            json!({
                "area_ids": [networking, facilities],
                "assignee": "bob",
                "actor": "ana"
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.body["global_state"], "assigned");
    let assignments = response.body["assignments"].as_array().unwrap();
    assert_eq!(assignments.len(), 2);
    assert!(assignments
        .iter()
        .all(|a| a["partial_state"] == "assigned" && a["elapsed_secs"] == 0));
}

#[tokio::test]
async fn test_assign_empty_area_list_is_rejected() {
    let fixture = TestFixture::new();
    let order = fixture.create_order("Empty assign").await;
    let response = fixture
        .post(
            &format!("/api/v1/orders/{order}/areas"),
            json!({ "area_ids": [] }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_partial_state_change_drives_global_state() {
    let fixture = TestFixture::new();
    let order = fixture.create_order("Lifecycle").await;
    let area = fixture.create_area("Networking").await;
    fixture
        .post(
            &format!("/api/v1/orders/{order}/areas"),
            json!({ "area_ids": [area] }),
        )
        .await;

    let response = fixture
        .put(
            &format!("/api/v1/orders/{order}/areas/{area}/state"),
            json!({ "state": "in_progress", "actor": "bob" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.body["partial_state"], "in_progress");
    assert!(response.body["started_at"].as_str().is_some());

    let detail = fixture.get(&format!("/api/v1/orders/{order}")).await;
    assert_eq!(detail.body["global_state"], "in_progress");

    let response = fixture
        .put(
            &format!("/api/v1/orders/{order}/areas/{area}/state"),
            json!({ "state": "completed", "notes": "done" }),
        )
        .await;
    assert_eq!(response.body["partial_state"], "completed");
    assert!(response.body["completed_at"].as_str().is_some());
    assert_eq!(response.body["notes"], "done");

    let detail = fixture.get(&format!("/api/v1/orders/{order}")).await;
    assert_eq!(detail.body["global_state"], "completed");
}

#[tokio::test]
async fn test_new_is_not_a_valid_partial_state() {
    let fixture = TestFixture::new();
    let order = fixture.create_order("Bad state").await;
    let area = fixture.create_area("Networking").await;
    fixture
        .post(
            &format!("/api/v1/orders/{order}/areas"),
            json!({ "area_ids": [area] }),
        )
        .await;

    let response = fixture
        .put(
            &format!("/api/v1/orders/{order}/areas/{area}/state"),
            json!({ "state": "new" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_remove_area_recomputes_global_state() {
    let fixture = TestFixture::new();
    let order = fixture.create_order("Removal").await;
    let networking = fixture.create_area("Networking").await;
    let facilities = fixture.create_area("Facilities").await;
    fixture
        .post(
            &format!("/api/v1/orders/{order}/areas"),
            json!({ "area_ids": [networking, facilities] }),
        )
        .await;
    fixture
        .put(
            &format!("/api/v1/orders/{order}/areas/{networking}/state"),
            json!({ "state": "completed" }),
        )
        .await;

    // Dropping the unfinished area leaves only completed work behind.
    let response = fixture
        .delete(&format!("/api/v1/orders/{order}/areas/{facilities}?actor=ana"))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.body["global_state"], "completed");
    assert_eq!(response.body["assignments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_order_removes_everything() {
    let fixture = TestFixture::new();
    let order = fixture.create_order("Doomed").await;
    let area = fixture.create_area("Networking").await;
    fixture
        .post(
            &format!("/api/v1/orders/{order}/areas"),
            json!({ "area_ids": [area] }),
        )
        .await;

    let response = fixture.delete(&format!("/api/v1/orders/{order}")).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = fixture.get(&format!("/api/v1/orders/{order}")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    let response = fixture.get(&format!("/api/v1/orders/{order}/history")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_history_records_lifecycle_events() {
    let fixture = TestFixture::new();
    let order = fixture.create_order("Audited").await;
    let area = fixture.create_area("Networking").await;
    fixture
        .post(
            &format!("/api/v1/orders/{order}/areas"),
            json!({ "area_ids": [area], "actor": "ana" }),
        )
        .await;

    let response = fixture.get(&format!("/api/v1/orders/{order}/history")).await;
    assert_eq!(response.status, StatusCode::OK);
    let history = response.body["history"].as_array().unwrap();
    let kinds: Vec<&str> = history
        .iter()
        .map(|r| r["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"created"));
    assert!(kinds.contains(&"area_assigned"));
    assert!(kinds.contains(&"global_state_changed"));
    // Most recent first; creation is the oldest record.
    assert_eq!(history.last().unwrap()["kind"], "created");
    assert_eq!(history.last().unwrap()["actor"], "ana");
}

#[tokio::test]
async fn test_recalculate_endpoint_reports_current_state() {
    let fixture = TestFixture::new();
    let order = fixture.create_order("Recalc").await;
    let response = fixture
        .post(&format!("/api/v1/orders/{order}/recalculate"), json!({}))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["global_state"], "new");
}

#[tokio::test]
async fn test_kpis_count_outcomes() {
    let fixture = TestFixture::new();
    let order = fixture.create_order("Counted").await;
    let area = fixture.create_area("Networking").await;
    fixture
        .post(
            &format!("/api/v1/orders/{order}/areas"),
            json!({ "area_ids": [area] }),
        )
        .await;
    fixture
        .put(
            &format!("/api/v1/orders/{order}/areas/{area}/state"),
            json!({ "state": "completed" }),
        )
        .await;
    fixture.create_order("Still open").await;

    let response = fixture.get("/api/v1/kpis").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total_orders"], 2);
    assert_eq!(response.body["completed"], 1);
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_order_gauges() {
    let fixture = TestFixture::new();
    fixture.create_order("Measured").await;

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/metrics")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(fixture.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = http_body_util::BodyExt::collect(response.into_body())
        .await
        .unwrap()
        .to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("orderflow_orders_by_state"));
}
