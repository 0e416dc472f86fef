use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::dto::common::{blank_as_none, blank_as_none_parsed, hex, hex_opt};
use crate::model::drug::Location;
use crate::model::movement::{Movement, MovementStatus, Priority, TrackingEvent};
use crate::repository::filters::{MovementFilter, Page};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMovementRequest {
    /// Drug `_id` (hex) or its `DRG-` label code.
    #[validate(length(min = 1, max = 64))]
    pub drug_id: String,
    #[validate(range(min = 1, max = 1_000_000_000))]
    pub quantity: i64,
    pub from: Location,
    pub to: Location,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    pub expected_delivery: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub driver: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: MovementStatus,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 200))]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScanMovementRequest {
    #[validate(length(min = 1, max = 200))]
    pub location: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignDriverRequest {
    #[serde(alias = "driverId")]
    #[validate(length(min = 1, max = 64))]
    pub driver: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementQuery {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub status: Option<MovementStatus>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub from: Option<Location>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub to: Option<Location>,
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    pub limit: Option<u32>,
}

impl MovementQuery {
    pub fn filter(&self) -> MovementFilter {
        MovementFilter {
            status: self.status,
            priority: self.priority,
            from: self.from,
            to: self.to,
            ..Default::default()
        }
    }

    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEventResponse {
    pub status: MovementStatus,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub updated_by: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<TrackingEvent> for TrackingEventResponse {
    fn from(event: TrackingEvent) -> Self {
        TrackingEventResponse {
            status: event.status,
            location: event.location,
            notes: event.notes,
            updated_by: hex_opt(&event.updated_by),
            timestamp: event.timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub movement_id: String,
    pub drug: String,
    pub drug_name: String,
    pub batch_no: String,
    pub quantity: i64,
    pub from: Location,
    pub to: Location,
    pub priority: Priority,
    pub status: MovementStatus,
    pub driver: Option<String>,
    pub requested_by: String,
    pub approved_by: Option<String>,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
    pub tracking: Vec<TrackingEventResponse>,
    pub stock_deducted: bool,
    pub qr_code: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Movement> for MovementResponse {
    fn from(movement: Movement) -> Self {
        MovementResponse {
            id: hex(&movement.id),
            movement_id: movement.movement_id,
            drug: movement.drug.to_hex(),
            drug_name: movement.drug_name,
            batch_no: movement.batch_no,
            quantity: movement.quantity,
            from: movement.from,
            to: movement.to,
            priority: movement.priority,
            status: movement.status,
            driver: hex_opt(&movement.driver),
            requested_by: movement.requested_by.to_hex(),
            approved_by: hex_opt(&movement.approved_by),
            expected_delivery: movement.expected_delivery,
            notes: movement.notes,
            tracking: movement.tracking.into_iter().map(TrackingEventResponse::from).collect(),
            stock_deducted: movement.stock_deducted,
            qr_code: movement.qr_code,
            approved_at: movement.approved_at,
            dispatched_at: movement.dispatched_at,
            delivered_at: movement.delivered_at,
            created_at: movement.created_at,
            updated_at: movement.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MovementEnvelope {
    pub success: bool,
    pub movement: MovementResponse,
}

#[derive(Debug, Serialize)]
pub struct MovementListResponse {
    pub success: bool,
    pub movements: Vec<MovementResponse>,
    pub total: u64,
    pub page: u64,
    pub pages: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementStats {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub in_transit: u64,
    pub delivered: u64,
    pub rejected: u64,
    pub cancelled: u64,
    pub by_priority: BTreeMap<String, u64>,
}

#[derive(Debug, Serialize)]
pub struct MovementStatsEnvelope {
    pub success: bool,
    pub stats: MovementStats,
}

/// Payload of the `movementStatusChanged` event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementStatusChanged {
    pub movement_id: String,
    pub status: MovementStatus,
}
