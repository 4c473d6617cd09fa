pub mod aggregate;
pub mod config;
pub mod history;
pub mod metrics;
pub mod order;
pub mod scheduler;
pub mod tick;

pub use aggregate::derive_global_state;
pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config, ConfigError,
    DatabaseConfig, ServerConfig,
};
pub use history::{Actor, HistoryEventKind, HistoryRecord};
pub use order::{
    Area, AssignAreasRequest, Assignment, CreateAreaRequest, CreateOrderRequest, KpiSummary,
    Order, OrderFilter, OrderStore, OrderSummary, PartialStateChange, Priority, SlaStats,
    SqliteOrderStore, StoreError, TickStats, WorkState,
};
pub use scheduler::{SchedulerStatus, SlaConfig, SlaScheduler};
pub use tick::{TickOutcome, TickProcessor};
