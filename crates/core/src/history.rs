//! Append-only order history.
//!
//! Every mutation of an order writes a history row in the same transaction
//! as the mutation itself, so the trail can never disagree with the state it
//! describes. Rows are immutable once written; there is no update or delete
//! path anywhere in the crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::order::WorkState;

/// What kind of event a history row records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryEventKind {
    /// Order created.
    Created,
    /// One or more areas assigned to the order.
    AreaAssigned,
    /// An area removed from the order.
    AreaRemoved,
    /// An assignment's partial state changed.
    PartialStateChanged,
    /// The derived global state of the order changed.
    GlobalStateChanged,
    /// The SLA tick forced an assignment into the timeout state.
    SlaTimeout,
}

impl HistoryEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryEventKind::Created => "created",
            HistoryEventKind::AreaAssigned => "area_assigned",
            HistoryEventKind::AreaRemoved => "area_removed",
            HistoryEventKind::PartialStateChanged => "partial_state_changed",
            HistoryEventKind::GlobalStateChanged => "global_state_changed",
            HistoryEventKind::SlaTimeout => "sla_timeout",
        }
    }

    pub fn parse(s: &str) -> Option<HistoryEventKind> {
        match s {
            "created" => Some(HistoryEventKind::Created),
            "area_assigned" => Some(HistoryEventKind::AreaAssigned),
            "area_removed" => Some(HistoryEventKind::AreaRemoved),
            "partial_state_changed" => Some(HistoryEventKind::PartialStateChanged),
            "global_state_changed" => Some(HistoryEventKind::GlobalStateChanged),
            "sla_timeout" => Some(HistoryEventKind::SlaTimeout),
            _ => None,
        }
    }
}

/// Who performed a mutation.
///
/// `System` covers server-initiated bookkeeping (creation defaults, derived
/// state recomputes); `Timer` is reserved for the SLA tick so timeout rows
/// are attributable at a glance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    System,
    Timer,
    User(String),
}

impl Actor {
    pub fn as_str(&self) -> &str {
        match self {
            Actor::System => "system",
            Actor::Timer => "system_timer",
            Actor::User(name) => name,
        }
    }

    pub fn parse(s: &str) -> Actor {
        match s {
            "system" => Actor::System,
            "system_timer" => Actor::Timer,
            other => Actor::User(other.to_string()),
        }
    }
}

impl Serialize for Actor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Actor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Actor::parse(&s))
    }
}

/// One immutable history row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryRecord {
    /// Monotonically increasing row ID.
    pub id: i64,
    pub order_id: String,
    pub kind: HistoryEventKind,
    /// Human-readable description of what happened.
    pub detail: String,
    /// Global state of the order after the event, when the event touched it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resulting_state: Option<WorkState>,
    pub actor: Actor,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_round_trips() {
        for kind in [
            HistoryEventKind::Created,
            HistoryEventKind::AreaAssigned,
            HistoryEventKind::AreaRemoved,
            HistoryEventKind::PartialStateChanged,
            HistoryEventKind::GlobalStateChanged,
            HistoryEventKind::SlaTimeout,
        ] {
            assert_eq!(HistoryEventKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(HistoryEventKind::parse("rebooted"), None);
    }

    #[test]
    fn test_actor_round_trips() {
        assert_eq!(Actor::parse("system"), Actor::System);
        assert_eq!(Actor::parse("system_timer"), Actor::Timer);
        assert_eq!(Actor::parse("ana"), Actor::User("ana".to_string()));
        assert_eq!(Actor::parse(Actor::Timer.as_str()), Actor::Timer);
    }

    #[test]
    fn test_actor_serializes_as_plain_string() {
        assert_eq!(serde_json::to_string(&Actor::System).unwrap(), "\"system\"");
        assert_eq!(
            serde_json::to_string(&Actor::User("ana".into())).unwrap(),
            "\"ana\""
        );
        let actor: Actor = serde_json::from_str("\"system_timer\"").unwrap();
        assert_eq!(actor, Actor::Timer);
    }

    #[test]
    fn test_record_json_shape() {
        let record = HistoryRecord {
            id: 7,
            order_id: "abc".into(),
            kind: HistoryEventKind::SlaTimeout,
            detail: "Area Networking exceeded the 60s threshold".into(),
            resulting_state: Some(WorkState::TimedOut),
            actor: Actor::Timer,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "sla_timeout");
        assert_eq!(json["actor"], "system_timer");
        assert_eq!(json["resulting_state"], "timed_out");
    }
}
