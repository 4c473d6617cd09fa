//! Prometheus registry and exposition for the server.
//!
//! Counters and histograms are updated inline by the core crate; gauges that
//! mirror database contents are refreshed from the store on each scrape.

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntGaugeVec, Opts, Registry, TextEncoder};

use orderflow_core::{OrderFilter, OrderStore, StoreError, WorkState};

/// Current number of orders per global state.
pub static ORDERS_BY_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("orderflow_orders_by_state", "Orders per global state"),
        &["state"],
    )
    .unwrap()
});

/// The registry served at `/metrics`.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in orderflow_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
    registry.register(Box::new(ORDERS_BY_STATE.clone())).unwrap();
    registry
});

/// Refresh the per-state order gauges from the store.
pub fn collect_order_gauges(store: &dyn OrderStore) -> Result<(), StoreError> {
    for state in WorkState::ALL {
        let count = store.count_orders(&OrderFilter::new().with_state(state))?;
        ORDERS_BY_STATE
            .with_label_values(&[state.as_str()])
            .set(count);
    }
    Ok(())
}

/// Encode the registry in Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}
