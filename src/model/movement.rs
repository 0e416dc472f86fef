use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::drug::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementStatus {
    Pending,
    Approved,
    InTransit,
    Delivered,
    Rejected,
    Cancelled,
}

impl MovementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementStatus::Pending => "pending",
            MovementStatus::Approved => "approved",
            MovementStatus::InTransit => "in_transit",
            MovementStatus::Delivered => "delivered",
            MovementStatus::Rejected => "rejected",
            MovementStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MovementStatus::Delivered | MovementStatus::Rejected | MovementStatus::Cancelled
        )
    }

    /// pending -> approved | rejected | cancelled, approved -> in_transit | cancelled,
    /// in_transit -> delivered. Terminal states accept nothing.
    pub fn can_transition_to(&self, next: MovementStatus) -> bool {
        use MovementStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Approved, InTransit)
                | (Approved, Cancelled)
                | (InTransit, Delivered)
        )
    }
}

impl std::fmt::Display for MovementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub status: MovementStatus,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub updated_by: Option<ObjectId>,
    #[serde(with = "crate::util::timestamp")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub movement_id: String,
    pub drug: ObjectId,
    pub drug_name: String,
    pub batch_no: String,
    pub quantity: i64,
    pub from: Location,
    pub to: Location,
    pub priority: Priority,
    pub status: MovementStatus,
    pub driver: Option<ObjectId>,
    pub requested_by: ObjectId,
    pub approved_by: Option<ObjectId>,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
    #[serde(default)]
    pub tracking: Vec<TrackingEvent>,
    /// True while the movement's quantity is held out of the source drug's stock.
    #[serde(default)]
    pub stock_deducted: bool,
    pub qr_code: Option<String>,
    #[serde(default, with = "crate::util::timestamp::option")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::util::timestamp::option")]
    pub dispatched_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::util::timestamp::option")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::util::timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::util::timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Movement {
    pub fn is_assigned_to(&self, user_id: &ObjectId) -> bool {
        self.driver.as_ref() == Some(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MovementStatus::*;

    #[test]
    fn test_forward_transitions() {
        assert!(Pending.can_transition_to(Approved));
        assert!(Approved.can_transition_to(InTransit));
        assert!(InTransit.can_transition_to(Delivered));
    }

    #[test]
    fn test_skipping_steps_is_rejected() {
        assert!(!Pending.can_transition_to(InTransit));
        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Approved.can_transition_to(Delivered));
        assert!(!InTransit.can_transition_to(Cancelled));
        assert!(!InTransit.can_transition_to(Approved));
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        for terminal in [Delivered, Rejected, Cancelled] {
            assert!(terminal.is_terminal());
            for next in [Pending, Approved, InTransit, Delivered, Rejected, Cancelled] {
                assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_value(InTransit).unwrap(), "in_transit");
        let parsed: MovementStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, Cancelled);
    }
}
