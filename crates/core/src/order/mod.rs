//! Work orders, areas and their SQLite-backed store.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteOrderStore;
pub use store::{
    AssignAreasRequest, CreateAreaRequest, CreateOrderRequest, KpiSummary, OrderFilter,
    OrderStore, PartialStateChange, SlaStats, StoreError, TickStats,
};
pub use types::{Area, Assignment, Order, OrderSummary, Priority, WorkState};
