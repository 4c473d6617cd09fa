//! Full order lifecycle integration tests.
//!
//! These tests drive an order through the complete flow against a real
//! database file: created -> areas assigned -> work started -> ticked ->
//! timed out / completed, checking the derived global state and the history
//! trail at each step.

use std::sync::Arc;

use tempfile::TempDir;

use orderflow_core::{
    Actor, AssignAreasRequest, CreateAreaRequest, CreateOrderRequest, HistoryEventKind,
    OrderStore, PartialStateChange, Priority, SlaConfig, SqliteOrderStore, TickProcessor,
    WorkState,
};

/// Test helper holding a file-backed store and a couple of seeded areas.
struct TestHarness {
    store: Arc<SqliteOrderStore>,
    networking: String,
    facilities: String,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let store = Arc::new(SqliteOrderStore::new(&db_path).expect("Failed to create store"));

        let networking = store
            .create_area(CreateAreaRequest {
                name: "Networking".into(),
                owner: "net-ops".into(),
                contact: Some("net@example.com".into()),
            })
            .unwrap()
            .id;
        let facilities = store
            .create_area(CreateAreaRequest {
                name: "Facilities".into(),
                owner: "facilities".into(),
                contact: None,
            })
            .unwrap()
            .id;

        Self {
            store,
            networking,
            facilities,
            _temp_dir: temp_dir,
        }
    }

    fn create_order(&self) -> String {
        self.store
            .create_order(CreateOrderRequest {
                title: "Patch rack cabling".into(),
                description: "Row 7, racks 3 through 5".into(),
                created_by: "ana".into(),
                priority: Priority::High,
            })
            .unwrap()
            .id
    }

    fn assign(&self, order_id: &str, areas: &[&str]) {
        self.store
            .assign_areas(
                order_id,
                AssignAreasRequest {
                    area_ids: areas.iter().map(|s| s.to_string()).collect(),
                    assignee: Some("bo".into()),
                    actor: Actor::User("ana".into()),
                },
            )
            .unwrap();
    }

    fn set_state(&self, order_id: &str, area_id: &str, state: WorkState) {
        self.store
            .set_partial_state(
                order_id,
                area_id,
                PartialStateChange {
                    new_state: state,
                    notes: None,
                    actor: Actor::User("bo".into()),
                },
            )
            .unwrap();
    }

    fn global(&self, order_id: &str) -> WorkState {
        self.store.get_order(order_id).unwrap().unwrap().global_state
    }
}

#[test]
fn test_order_completes_through_both_areas() {
    let h = TestHarness::new();
    let order = h.create_order();
    assert_eq!(h.global(&order), WorkState::New);

    h.assign(&order, &[h.networking.as_str(), h.facilities.as_str()]);
    assert_eq!(h.global(&order), WorkState::Assigned);

    h.set_state(&order, &h.networking, WorkState::InProgress);
    assert_eq!(h.global(&order), WorkState::InProgress);

    h.set_state(&order, &h.networking, WorkState::Completed);
    assert_eq!(h.global(&order), WorkState::Pending);

    h.set_state(&order, &h.facilities, WorkState::InProgress);
    assert_eq!(h.global(&order), WorkState::InProgress);

    h.set_state(&order, &h.facilities, WorkState::Completed);
    assert_eq!(h.global(&order), WorkState::Completed);

    let history = h.store.order_history(&order).unwrap();
    let completion = &history[0];
    assert_eq!(completion.kind, HistoryEventKind::GlobalStateChanged);
    assert_eq!(completion.resulting_state, Some(WorkState::Completed));
}

#[test]
fn test_tick_processor_times_out_and_sibling_areas_survive() {
    let h = TestHarness::new();
    let order = h.create_order();
    h.assign(&order, &[h.networking.as_str(), h.facilities.as_str()]);
    h.set_state(&order, &h.networking, WorkState::InProgress);
    h.set_state(&order, &h.facilities, WorkState::Pending);

    let config = SlaConfig {
        tick_interval_secs: 30,
        sla_threshold_secs: 60,
        ..SlaConfig::default()
    };
    let processor = TickProcessor::new(h.store.clone(), config);

    let outcome = processor.run_tick();
    assert!(outcome.succeeded());
    assert_eq!(outcome.areas_updated, 2);
    assert_eq!(outcome.timeouts_applied, 0);

    let outcome = processor.run_tick();
    assert_eq!(outcome.timeouts_applied, 1);
    assert_eq!(outcome.orders_recalculated, vec![order.clone()]);

    let assignments = h.store.assignments(&order).unwrap();
    let networking = assignments
        .iter()
        .find(|a| a.area_id == h.networking)
        .unwrap();
    let facilities = assignments
        .iter()
        .find(|a| a.area_id == h.facilities)
        .unwrap();

    assert_eq!(networking.partial_state, WorkState::TimedOut);
    assert!(networking.completed_at.is_none());
    // Pending work passes the threshold without being timed out.
    assert_eq!(facilities.partial_state, WorkState::Pending);
    assert_eq!(facilities.elapsed_secs, 60);

    assert_eq!(h.global(&order), WorkState::TimedOut);

    let history = h.store.order_history(&order).unwrap();
    let timeout = history
        .iter()
        .find(|r| r.kind == HistoryEventKind::SlaTimeout)
        .unwrap();
    assert_eq!(timeout.actor, Actor::Timer);
    assert!(timeout.detail.contains("Networking"));
}

#[test]
fn test_tick_spans_multiple_orders_in_one_pass() {
    let h = TestHarness::new();
    let o1 = h.create_order();
    let o2 = h.create_order();
    h.assign(&o1, &[h.networking.as_str()]);
    h.assign(&o2, &[h.facilities.as_str()]);
    h.set_state(&o1, &h.networking, WorkState::InProgress);
    h.set_state(&o2, &h.facilities, WorkState::InProgress);

    let processor = TickProcessor::new(h.store.clone(), SlaConfig::default());
    let outcome = processor.run_tick();
    assert_eq!(outcome.areas_updated, 2);
    let mut recalculated = outcome.orders_recalculated.clone();
    recalculated.sort();
    let mut expected = vec![o1, o2];
    expected.sort();
    assert_eq!(recalculated, expected);
}

#[test]
fn test_elapsed_counters_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let order_id;
    let area_id;
    {
        let store = Arc::new(SqliteOrderStore::new(&db_path).unwrap());
        area_id = store
            .create_area(CreateAreaRequest {
                name: "Networking".into(),
                owner: "ops".into(),
                contact: None,
            })
            .unwrap()
            .id;
        order_id = store
            .create_order(CreateOrderRequest {
                title: "t".into(),
                description: "d".into(),
                created_by: "ana".into(),
                priority: Priority::default(),
            })
            .unwrap()
            .id;
        store
            .assign_areas(
                &order_id,
                AssignAreasRequest {
                    area_ids: vec![area_id.clone()],
                    assignee: None,
                    actor: Actor::System,
                },
            )
            .unwrap();
        store
            .set_partial_state(
                &order_id,
                &area_id,
                PartialStateChange {
                    new_state: WorkState::InProgress,
                    notes: None,
                    actor: Actor::System,
                },
            )
            .unwrap();
        TickProcessor::new(store, SlaConfig::default()).run_tick();
    }

    let store = SqliteOrderStore::new(&db_path).unwrap();
    let assignment = &store.assignments(&order_id).unwrap()[0];
    assert_eq!(assignment.elapsed_secs, 10);
    assert_eq!(assignment.partial_state, WorkState::InProgress);
    assert!(store
        .order_history(&order_id)
        .unwrap()
        .iter()
        .any(|r| r.kind == HistoryEventKind::AreaAssigned));
}
