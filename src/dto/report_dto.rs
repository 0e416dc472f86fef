use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::dto::alert_dto::AlertStats;
use crate::dto::common::{blank_as_none, blank_as_none_parsed};
use crate::dto::drug_dto::{DrugResponse, InventoryStats, StockBucket};
use crate::dto::movement_dto::{MovementResponse, MovementStats};
use crate::model::drug::{DrugCategory, Location, StockStatus};
use crate::model::movement::MovementStatus;

pub const DEFAULT_EXPIRY_REPORT_DAYS: i64 = 90;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryReportQuery {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub location: Option<Location>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category: Option<DrugCategory>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub status: Option<StockStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementReportQuery {
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    pub start_date: Option<NaiveDate>,
    /// Inclusive.
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub status: Option<MovementStatus>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct ExpiryReportQuery {
    #[validate(range(min = 0, max = 3650))]
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    pub days: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionReportQuery {
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub location: Option<Location>,
}

/// Common report frame; `S` is the summary, `I` the item type, `E` extra sections.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report<F, S, I, E = NoExtras> {
    #[serde(rename = "type")]
    pub report_type: &'static str,
    pub generated_at: DateTime<Utc>,
    pub filters: F,
    pub summary: S,
    pub items: Vec<I>,
    #[serde(flatten)]
    pub extras: E,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NoExtras {}

#[derive(Debug, Serialize)]
pub struct ReportEnvelope<T> {
    pub success: bool,
    pub report: T,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub total_items: u64,
    pub total_quantity: i64,
    pub total_value: f64,
    pub low_stock: u64,
    pub out_of_stock: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryBreakdown {
    pub by_location: BTreeMap<String, StockBucket>,
    pub by_category: BTreeMap<String, StockBucket>,
}

pub type InventoryReport = Report<InventoryReportQuery, InventorySummary, DrugResponse, InventoryBreakdown>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementSummary {
    pub total: u64,
    pub total_quantity: i64,
    pub by_status: BTreeMap<String, u64>,
    pub by_priority: BTreeMap<String, u64>,
}

pub type MovementReport = Report<MovementReportQuery, MovementSummary, MovementResponse>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpirySummary {
    pub expired: u64,
    pub within30: u64,
    pub within60: u64,
    pub within90: u64,
    pub total_value_at_risk: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub drug_id: String,
    pub name: String,
    pub batch_no: String,
    pub location: Location,
    pub quantity: i64,
    pub expiry_date: NaiveDate,
    pub days_to_expiry: i64,
    pub value_at_risk: f64,
}

pub type ExpiryReport = Report<ExpiryReportQuery, ExpirySummary, ExpiryItem>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionSummary {
    pub total_quantity: i64,
    pub movement_count: u64,
    pub drug_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionItem {
    pub drug: String,
    pub drug_name: String,
    pub batch_no: String,
    pub quantity: i64,
    pub movement_count: u64,
}

pub type ConsumptionReport = Report<ConsumptionReportQuery, ConsumptionSummary, ConsumptionItem>;

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardStats {
    pub inventory: InventoryStats,
    pub movements: MovementStats,
    pub alerts: AlertStats,
}

#[derive(Debug, Serialize)]
pub struct DashboardEnvelope {
    pub success: bool,
    pub stats: DashboardStats,
}
