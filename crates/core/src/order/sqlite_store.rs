//! SQLite-backed order store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{
    Area, AssignAreasRequest, Assignment, CreateAreaRequest, CreateOrderRequest, Order,
    OrderFilter, OrderStore, OrderSummary, PartialStateChange, Priority, StoreError, TickStats,
    WorkState,
};
use crate::aggregate::derive_global_state;
use crate::history::{Actor, HistoryEventKind, HistoryRecord};
use crate::metrics;
use crate::order::{KpiSummary, SlaStats};
use crate::scheduler::SlaConfig;

const ORDER_COLUMNS: &str =
    "id, title, description, created_by, priority, global_state, created_at, updated_at";

const ASSIGNMENT_COLUMNS: &str = "a.id, a.order_id, a.area_id, ar.name, a.assignee, \
     a.partial_state, a.elapsed_secs, a.assigned_at, a.started_at, a.paused_at, \
     a.completed_at, a.notes";

/// SQLite-backed order store.
///
/// All mutating methods run inside a single transaction, including the
/// history rows they append, so a failure rolls back both the state change
/// and its trail together.
pub struct SqliteOrderStore {
    conn: Mutex<Connection>,
}

impl SqliteOrderStore {
    /// Open a store at the given path, creating the database and tables if
    /// needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS areas (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                owner TEXT NOT NULL,
                contact TEXT,
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS orders (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                created_by TEXT NOT NULL,
                priority TEXT NOT NULL,
                global_state TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS assignments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                order_id TEXT NOT NULL REFERENCES orders(id),
                area_id TEXT NOT NULL REFERENCES areas(id),
                assignee TEXT,
                partial_state TEXT NOT NULL,
                elapsed_secs INTEGER NOT NULL DEFAULT 0,
                assigned_at TEXT NOT NULL,
                started_at TEXT,
                paused_at TEXT,
                completed_at TEXT,
                notes TEXT,
                UNIQUE(order_id, area_id)
            );

            CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                order_id TEXT NOT NULL REFERENCES orders(id),
                kind TEXT NOT NULL,
                detail TEXT NOT NULL,
                resulting_state TEXT,
                actor TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_orders_state ON orders(global_state);
            CREATE INDEX IF NOT EXISTS idx_orders_created_by ON orders(created_by);
            CREATE INDEX IF NOT EXISTS idx_assignments_order ON assignments(order_id);
            CREATE INDEX IF NOT EXISTS idx_assignments_state ON assignments(partial_state);
            CREATE INDEX IF NOT EXISTS idx_history_order ON history(order_id);
            "#,
        )?;
        Ok(())
    }

    fn build_where_clause(filter: &OrderFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(state) = filter.state {
            conditions.push("o.global_state = ?");
            params.push(Box::new(state.as_str()));
        }

        if let Some(ref created_by) = filter.created_by {
            conditions.push("o.created_by = ?");
            params.push(Box::new(created_by.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn row_to_order(row: &rusqlite::Row) -> rusqlite::Result<Order> {
        Ok(Order {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            created_by: row.get(3)?,
            priority: Priority::parse(&row.get::<_, String>(4)?).unwrap_or_default(),
            global_state: WorkState::parse(&row.get::<_, String>(5)?).unwrap_or(WorkState::New),
            created_at: parse_ts(&row.get::<_, String>(6)?),
            updated_at: parse_ts(&row.get::<_, String>(7)?),
        })
    }

    fn row_to_area(row: &rusqlite::Row) -> rusqlite::Result<Area> {
        Ok(Area {
            id: row.get(0)?,
            name: row.get(1)?,
            owner: row.get(2)?,
            contact: row.get(3)?,
            active: row.get::<_, i64>(4)? != 0,
            created_at: parse_ts(&row.get::<_, String>(5)?),
        })
    }

    fn row_to_assignment(row: &rusqlite::Row) -> rusqlite::Result<Assignment> {
        Ok(Assignment {
            id: row.get(0)?,
            order_id: row.get(1)?,
            area_id: row.get(2)?,
            area_name: row.get(3)?,
            assignee: row.get(4)?,
            partial_state: WorkState::parse(&row.get::<_, String>(5)?)
                .unwrap_or(WorkState::Assigned),
            elapsed_secs: row.get(6)?,
            assigned_at: parse_ts(&row.get::<_, String>(7)?),
            started_at: row.get::<_, Option<String>>(8)?.map(|s| parse_ts(&s)),
            paused_at: row.get::<_, Option<String>>(9)?.map(|s| parse_ts(&s)),
            completed_at: row.get::<_, Option<String>>(10)?.map(|s| parse_ts(&s)),
            notes: row.get(11)?,
        })
    }

    fn row_to_history(row: &rusqlite::Row) -> rusqlite::Result<HistoryRecord> {
        Ok(HistoryRecord {
            id: row.get(0)?,
            order_id: row.get(1)?,
            kind: HistoryEventKind::parse(&row.get::<_, String>(2)?)
                .unwrap_or(HistoryEventKind::Created),
            detail: row.get(3)?,
            resulting_state: row
                .get::<_, Option<String>>(4)?
                .and_then(|s| WorkState::parse(&s)),
            actor: Actor::parse(&row.get::<_, String>(5)?),
            timestamp: parse_ts(&row.get::<_, String>(6)?),
        })
    }

    fn fetch_order(conn: &Connection, id: &str) -> Result<Option<Order>, StoreError> {
        let order = conn
            .query_row(
                &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"),
                params![id],
                Self::row_to_order,
            )
            .optional()?;
        Ok(order)
    }

    fn require_order(conn: &Connection, id: &str) -> Result<Order, StoreError> {
        Self::fetch_order(conn, id)?.ok_or_else(|| StoreError::NotFound(format!("order {id}")))
    }

    fn fetch_assignments(conn: &Connection, order_id: &str) -> Result<Vec<Assignment>, StoreError> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments a \
             JOIN areas ar ON ar.id = a.area_id \
             WHERE a.order_id = ?1 ORDER BY a.id"
        ))?;
        let assignments = stmt
            .query_map(params![order_id], Self::row_to_assignment)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(assignments)
    }

    fn append_history(
        conn: &Connection,
        order_id: &str,
        kind: HistoryEventKind,
        detail: &str,
        resulting_state: Option<WorkState>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        conn.execute(
            "INSERT INTO history (order_id, kind, detail, resulting_state, actor, timestamp) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                order_id,
                kind.as_str(),
                detail,
                resulting_state.map(|s| s.as_str()),
                actor.as_str(),
                now.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Recompute the global state of one order inside the caller's
    /// transaction. Persists the new state and appends a history row only
    /// when the state actually changed.
    fn recalculate_in_conn(
        conn: &Connection,
        order_id: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<WorkState, StoreError> {
        let current: Option<String> = conn
            .query_row(
                "SELECT global_state FROM orders WHERE id = ?1",
                params![order_id],
                |row| row.get(0),
            )
            .optional()?;
        let current = current.ok_or_else(|| StoreError::NotFound(format!("order {order_id}")))?;
        let current = WorkState::parse(&current).unwrap_or(WorkState::New);

        let mut stmt = conn.prepare("SELECT partial_state FROM assignments WHERE order_id = ?1")?;
        let states = stmt
            .query_map(params![order_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        let states: Vec<WorkState> = states
            .iter()
            .map(|s| WorkState::parse(s).unwrap_or(WorkState::Assigned))
            .collect();

        let derived = derive_global_state(&states);
        if derived != current {
            conn.execute(
                "UPDATE orders SET global_state = ?1, updated_at = ?2 WHERE id = ?3",
                params![derived.as_str(), now.to_rfc3339(), order_id],
            )?;
            Self::append_history(
                conn,
                order_id,
                HistoryEventKind::GlobalStateChanged,
                &format!("Global state: {} -> {}", current.as_str(), derived.as_str()),
                Some(derived),
                actor,
                now,
            )?;
            metrics::GLOBAL_STATE_CHANGES
                .with_label_values(&[derived.as_str()])
                .inc();
        }
        Ok(derived)
    }
}

impl OrderStore for SqliteOrderStore {
    fn create_order(&self, request: CreateOrderRequest) -> Result<Order, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        tx.execute(
            "INSERT INTO orders (id, title, description, created_by, priority, global_state, \
             created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                request.title,
                request.description,
                request.created_by,
                request.priority.as_str(),
                WorkState::New.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;
        Self::append_history(
            &tx,
            &id,
            HistoryEventKind::Created,
            &format!("Order created: {}", request.title),
            Some(WorkState::New),
            &Actor::User(request.created_by.clone()),
            now,
        )?;

        let order = Self::require_order(&tx, &id)?;
        tx.commit()?;
        metrics::ORDERS_CREATED_TOTAL.inc();
        Ok(order)
    }

    fn get_order(&self, id: &str) -> Result<Option<Order>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::fetch_order(&conn, id)
    }

    fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<OrderSummary>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let (where_clause, mut sql_params) = Self::build_where_clause(filter);

        let query = format!(
            "SELECT o.id, o.title, o.created_by, o.priority, o.global_state, \
             COUNT(a.id), \
             COALESCE(SUM(CASE WHEN a.partial_state = 'completed' THEN 1 ELSE 0 END), 0), \
             COALESCE(SUM(a.elapsed_secs), 0), \
             o.created_at, o.updated_at \
             FROM orders o \
             LEFT JOIN assignments a ON a.order_id = o.id \
             {where_clause} \
             GROUP BY o.id \
             ORDER BY o.created_at DESC \
             LIMIT ? OFFSET ?"
        );
        sql_params.push(Box::new(filter.limit));
        sql_params.push(Box::new(filter.offset));
        let param_refs: Vec<&dyn rusqlite::ToSql> = sql_params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&query)?;
        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok(OrderSummary {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    created_by: row.get(2)?,
                    priority: Priority::parse(&row.get::<_, String>(3)?).unwrap_or_default(),
                    global_state: WorkState::parse(&row.get::<_, String>(4)?)
                        .unwrap_or(WorkState::New),
                    num_areas: row.get(5)?,
                    areas_completed: row.get(6)?,
                    total_secs: row.get(7)?,
                    created_at: parse_ts(&row.get::<_, String>(8)?),
                    updated_at: parse_ts(&row.get::<_, String>(9)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn count_orders(&self, filter: &OrderFilter) -> Result<i64, StoreError> {
        let conn = self.conn.lock().unwrap();
        let (where_clause, sql_params) = Self::build_where_clause(filter);
        let query = format!("SELECT COUNT(*) FROM orders o {where_clause}");
        let param_refs: Vec<&dyn rusqlite::ToSql> = sql_params.iter().map(|p| p.as_ref()).collect();
        let count = conn.query_row(&query, param_refs.as_slice(), |row| row.get(0))?;
        Ok(count)
    }

    fn delete_order(&self, id: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        // Child rows reference orders(id), so they go first.
        tx.execute("DELETE FROM assignments WHERE order_id = ?1", params![id])?;
        tx.execute("DELETE FROM history WHERE order_id = ?1", params![id])?;
        let deleted = tx.execute("DELETE FROM orders WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("order {id}")));
        }
        tx.commit()?;
        Ok(())
    }

    fn create_area(&self, request: CreateAreaRequest) -> Result<Area, StoreError> {
        let conn = self.conn.lock().unwrap();
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO areas (id, name, owner, contact, active, created_at) \
             VALUES (?1, ?2, ?3, ?4, 1, ?5)",
            params![id, request.name, request.owner, request.contact, now.to_rfc3339()],
        )
        .map_err(|err| match err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict(format!("area name already exists: {}", request.name))
            }
            other => StoreError::from(other),
        })?;

        let area = conn.query_row(
            "SELECT id, name, owner, contact, active, created_at FROM areas WHERE id = ?1",
            params![id],
            Self::row_to_area,
        )?;
        Ok(area)
    }

    fn get_area(&self, id: &str) -> Result<Option<Area>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let area = conn
            .query_row(
                "SELECT id, name, owner, contact, active, created_at FROM areas WHERE id = ?1",
                params![id],
                Self::row_to_area,
            )
            .optional()?;
        Ok(area)
    }

    fn list_areas(&self, active: Option<bool>) -> Result<Vec<Area>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let (query, bind): (&str, Option<i64>) = match active {
            Some(flag) => (
                "SELECT id, name, owner, contact, active, created_at FROM areas \
                 WHERE active = ?1 ORDER BY name",
                Some(i64::from(flag)),
            ),
            None => (
                "SELECT id, name, owner, contact, active, created_at FROM areas ORDER BY name",
                None,
            ),
        };
        let mut stmt = conn.prepare(query)?;
        let areas = match bind {
            Some(flag) => stmt
                .query_map(params![flag], Self::row_to_area)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], Self::row_to_area)?
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(areas)
    }

    fn assignments(&self, order_id: &str) -> Result<Vec<Assignment>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::require_order(&conn, order_id)?;
        Self::fetch_assignments(&conn, order_id)
    }

    fn assign_areas(
        &self,
        order_id: &str,
        request: AssignAreasRequest,
    ) -> Result<Order, StoreError> {
        if request.area_ids.is_empty() {
            return Err(StoreError::Conflict("at least one area is required".into()));
        }

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        Self::require_order(&tx, order_id)?;

        let now = Utc::now();
        let mut names = Vec::with_capacity(request.area_ids.len());
        for area_id in &request.area_ids {
            let name: Option<String> = tx
                .query_row(
                    "SELECT name FROM areas WHERE id = ?1",
                    params![area_id],
                    |row| row.get(0),
                )
                .optional()?;
            let name = name.ok_or_else(|| StoreError::NotFound(format!("area {area_id}")))?;

            let already: i64 = tx.query_row(
                "SELECT COUNT(*) FROM assignments WHERE order_id = ?1 AND area_id = ?2",
                params![order_id, area_id],
                |row| row.get(0),
            )?;
            if already > 0 {
                return Err(StoreError::Conflict(format!(
                    "area {name} is already assigned to order {order_id}"
                )));
            }

            tx.execute(
                "INSERT INTO assignments (order_id, area_id, assignee, partial_state, \
                 elapsed_secs, assigned_at) VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                params![
                    order_id,
                    area_id,
                    request.assignee,
                    WorkState::Assigned.as_str(),
                    now.to_rfc3339(),
                ],
            )?;
            names.push(name);
        }

        Self::append_history(
            &tx,
            order_id,
            HistoryEventKind::AreaAssigned,
            &format!("Areas assigned: {}", names.join(", ")),
            None,
            &request.actor,
            now,
        )?;
        Self::recalculate_in_conn(&tx, order_id, &Actor::System, now)?;

        let order = Self::require_order(&tx, order_id)?;
        tx.commit()?;
        Ok(order)
    }

    fn remove_area(
        &self,
        order_id: &str,
        area_id: &str,
        actor: &Actor,
    ) -> Result<Order, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        Self::require_order(&tx, order_id)?;

        let name: Option<String> = tx
            .query_row(
                "SELECT ar.name FROM assignments a JOIN areas ar ON ar.id = a.area_id \
                 WHERE a.order_id = ?1 AND a.area_id = ?2",
                params![order_id, area_id],
                |row| row.get(0),
            )
            .optional()?;
        let name = name.ok_or_else(|| {
            StoreError::NotFound(format!("area {area_id} is not assigned to order {order_id}"))
        })?;

        let now = Utc::now();
        tx.execute(
            "DELETE FROM assignments WHERE order_id = ?1 AND area_id = ?2",
            params![order_id, area_id],
        )?;
        Self::append_history(
            &tx,
            order_id,
            HistoryEventKind::AreaRemoved,
            &format!("Area removed: {name}"),
            None,
            actor,
            now,
        )?;
        Self::recalculate_in_conn(&tx, order_id, &Actor::System, now)?;

        let order = Self::require_order(&tx, order_id)?;
        tx.commit()?;
        Ok(order)
    }

    fn set_partial_state(
        &self,
        order_id: &str,
        area_id: &str,
        change: PartialStateChange,
    ) -> Result<Assignment, StoreError> {
        if !change.new_state.is_assignable() {
            return Err(StoreError::InvalidTransition(format!(
                "{} is not a valid partial state",
                change.new_state.as_str()
            )));
        }

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let current = tx
            .query_row(
                &format!(
                    "SELECT {ASSIGNMENT_COLUMNS} FROM assignments a \
                     JOIN areas ar ON ar.id = a.area_id \
                     WHERE a.order_id = ?1 AND a.area_id = ?2"
                ),
                params![order_id, area_id],
                Self::row_to_assignment,
            )
            .optional()?;
        let current = current.ok_or_else(|| {
            StoreError::NotFound(format!("area {area_id} is not assigned to order {order_id}"))
        })?;

        let now = Utc::now();
        // started_at and completed_at are stamped once; paused_at moves on
        // every pause.
        let started_at = match (change.new_state, current.started_at) {
            (WorkState::InProgress, None) => Some(now),
            (_, existing) => existing,
        };
        let paused_at = match change.new_state {
            WorkState::Pending => Some(now),
            _ => current.paused_at,
        };
        let completed_at = match (change.new_state, current.completed_at) {
            (WorkState::Completed | WorkState::ClosedNoSolution, None) => Some(now),
            (_, existing) => existing,
        };

        tx.execute(
            "UPDATE assignments SET partial_state = ?1, started_at = ?2, paused_at = ?3, \
             completed_at = ?4, notes = COALESCE(?5, notes) WHERE id = ?6",
            params![
                change.new_state.as_str(),
                started_at.map(|t| t.to_rfc3339()),
                paused_at.map(|t| t.to_rfc3339()),
                completed_at.map(|t| t.to_rfc3339()),
                change.notes,
                current.id,
            ],
        )?;
        Self::append_history(
            &tx,
            order_id,
            HistoryEventKind::PartialStateChanged,
            &format!(
                "Area {}: {} -> {}",
                current.area_name,
                current.partial_state.as_str(),
                change.new_state.as_str()
            ),
            None,
            &change.actor,
            now,
        )?;
        Self::recalculate_in_conn(&tx, order_id, &Actor::System, now)?;

        let updated = tx.query_row(
            &format!(
                "SELECT {ASSIGNMENT_COLUMNS} FROM assignments a \
                 JOIN areas ar ON ar.id = a.area_id WHERE a.id = ?1"
            ),
            params![current.id],
            Self::row_to_assignment,
        )?;
        tx.commit()?;
        Ok(updated)
    }

    fn recalculate_global_state(&self, order_id: &str) -> Result<WorkState, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let state = Self::recalculate_in_conn(&tx, order_id, &Actor::System, Utc::now())?;
        tx.commit()?;
        Ok(state)
    }

    fn run_tick(&self, config: &SlaConfig) -> Result<TickStats, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let now = Utc::now();

        // 1. Advance elapsed counters for everything still accruing.
        let areas_updated = tx.execute(
            "UPDATE assignments SET elapsed_secs = elapsed_secs + ?1 \
             WHERE partial_state IN ('in_progress', 'pending')",
            params![i64::from(config.tick_interval_secs)],
        )?;

        // 2. Force in-progress assignments past the threshold into the
        //    timeout state. completed_at stays NULL: a timeout is not a
        //    completion.
        let expired: Vec<(i64, String, String, i64)> = {
            let mut stmt = tx.prepare(
                "SELECT a.id, a.order_id, ar.name, a.elapsed_secs FROM assignments a \
                 JOIN areas ar ON ar.id = a.area_id \
                 WHERE a.partial_state = 'in_progress' AND a.elapsed_secs >= ?1",
            )?;
            let rows = stmt
                .query_map(params![i64::from(config.sla_threshold_secs)], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        for (assignment_id, order_id, area_name, elapsed) in &expired {
            tx.execute(
                "UPDATE assignments SET partial_state = ?1 WHERE id = ?2",
                params![config.timeout_state.as_str(), assignment_id],
            )?;
            Self::append_history(
                &tx,
                order_id,
                HistoryEventKind::SlaTimeout,
                &format!(
                    "Area {} exceeded the {}s threshold after {}s",
                    area_name, config.sla_threshold_secs, elapsed
                ),
                None,
                &Actor::Timer,
                now,
            )?;
        }

        // 3. Recompute the global state of every order the tick touched.
        let affected: Vec<String> = {
            let mut stmt = tx.prepare(
                "SELECT DISTINCT order_id FROM assignments \
                 WHERE partial_state IN ('in_progress', 'pending', ?1) ORDER BY order_id",
            )?;
            let rows = stmt
                .query_map(params![config.timeout_state.as_str()], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        for order_id in &affected {
            Self::recalculate_in_conn(&tx, order_id, &Actor::System, now)?;
        }

        tx.commit()?;
        metrics::SLA_TIMEOUTS_TOTAL.inc_by(expired.len() as u64);
        Ok(TickStats {
            areas_updated: areas_updated as u64,
            timeouts_applied: expired.len() as u64,
            orders_recalculated: affected,
        })
    }

    fn order_history(&self, order_id: &str) -> Result<Vec<HistoryRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::require_order(&conn, order_id)?;
        let mut stmt = conn.prepare(
            "SELECT id, order_id, kind, detail, resulting_state, actor, timestamp \
             FROM history WHERE order_id = ?1 ORDER BY timestamp DESC, id DESC",
        )?;
        let records = stmt
            .query_map(params![order_id], Self::row_to_history)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn sla_stats(&self, config: &SlaConfig) -> Result<SlaStats, StoreError> {
        let conn = self.conn.lock().unwrap();

        let active: i64 = conn.query_row(
            "SELECT COUNT(*) FROM assignments WHERE partial_state IN ('in_progress', 'pending')",
            [],
            |row| row.get(0),
        )?;
        let near_cutoff = (f64::from(config.sla_threshold_secs) * 0.8).ceil() as i64;
        let near_limit: i64 = conn.query_row(
            "SELECT COUNT(*) FROM assignments \
             WHERE partial_state = 'in_progress' AND elapsed_secs >= ?1 AND elapsed_secs < ?2",
            params![near_cutoff, i64::from(config.sla_threshold_secs)],
            |row| row.get(0),
        )?;
        let timed_out: i64 = conn.query_row(
            "SELECT COUNT(*) FROM assignments WHERE partial_state = ?1",
            params![config.timeout_state.as_str()],
            |row| row.get(0),
        )?;
        let avg_elapsed_secs: f64 = conn
            .query_row(
                "SELECT AVG(elapsed_secs) FROM assignments \
                 WHERE partial_state IN ('in_progress', 'pending')",
                [],
                |row| row.get::<_, Option<f64>>(0),
            )?
            .unwrap_or(0.0);

        let compliance_pct = if active > 0 {
            (active - timed_out) as f64 / active as f64 * 100.0
        } else {
            100.0
        };

        Ok(SlaStats {
            sla_threshold_secs: config.sla_threshold_secs,
            active_assignments: active,
            near_limit,
            timed_out,
            avg_elapsed_secs,
            compliance_pct,
        })
    }

    fn kpis(&self) -> Result<KpiSummary, StoreError> {
        let conn = self.conn.lock().unwrap();
        let count_state = |state: &str| -> Result<i64, StoreError> {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM orders WHERE global_state = ?1",
                params![state],
                |row| row.get(0),
            )?;
            Ok(count)
        };

        let total_orders: i64 =
            conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))?;
        let completed = count_state(WorkState::Completed.as_str())?;
        let closed_no_solution = count_state(WorkState::ClosedNoSolution.as_str())?;
        let open: i64 = conn.query_row(
            "SELECT COUNT(*) FROM orders \
             WHERE global_state IN ('assigned', 'in_progress', 'pending')",
            [],
            |row| row.get(0),
        )?;

        Ok(KpiSummary {
            total_orders,
            completed,
            closed_no_solution,
            open,
        })
    }
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
