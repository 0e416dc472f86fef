use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::dto::common::{blank_as_none, blank_as_none_parsed, hex, hex_opt};
use crate::model::drug::{Drug, DrugCategory, DrugUnit, Location, StockStatus, StorageCondition};
use crate::repository::filters::{DrugFilter, Page};

pub const DEFAULT_MIN_THRESHOLD: i64 = 50;
pub const DEFAULT_MAX_THRESHOLD: i64 = 1000;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDrugRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 200))]
    pub generic_name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category: Option<DrugCategory>,
    #[validate(length(min = 1, max = 64))]
    pub batch_no: String,
    #[validate(range(min = 0, max = 1_000_000_000))]
    pub quantity: i64,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub unit: Option<DrugUnit>,
    #[validate(range(min = 0.0))]
    pub price: f64,
    #[validate(length(min = 1, max = 200))]
    pub manufacturer: String,
    #[validate(length(min = 1, max = 200))]
    pub supplier: String,
    pub manufacture_date: NaiveDate,
    pub expiry_date: NaiveDate,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub location: Option<Location>,
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    #[validate(range(min = 0, max = 1_000_000_000))]
    pub min_threshold: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    #[validate(range(min = 0, max = 1_000_000_000))]
    pub max_threshold: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub storage_condition: Option<StorageCondition>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(url)]
    pub image_url: Option<String>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDrugRequest {
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 200))]
    pub generic_name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category: Option<DrugCategory>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(min = 1, max = 64))]
    pub batch_no: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    #[validate(range(min = 0, max = 1_000_000_000))]
    pub quantity: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub unit: Option<DrugUnit>,
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub manufacturer: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub supplier: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    pub manufacture_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub location: Option<Location>,
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    #[validate(range(min = 0, max = 1_000_000_000))]
    pub min_threshold: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    #[validate(range(min = 0, max = 1_000_000_000))]
    pub max_threshold: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub storage_condition: Option<StorageCondition>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(url)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugQuery {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category: Option<DrugCategory>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub location: Option<Location>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub stock_status: Option<StockStatus>,
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    pub limit: Option<u32>,
}

impl DrugQuery {
    pub fn filter(&self) -> DrugFilter {
        DrugFilter {
            search: self.search.clone(),
            category: self.category,
            location: self.location,
            stock_statuses: self.stock_status.into_iter().collect(),
            expiring_on_or_before: None,
        }
    }

    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScanDrugRequest {
    #[validate(length(min = 1, max = 64))]
    pub drug_id: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub batch_no: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub drug_id: String,
    pub name: String,
    pub generic_name: Option<String>,
    pub category: DrugCategory,
    pub batch_no: String,
    pub quantity: i64,
    pub unit: DrugUnit,
    pub price: f64,
    pub manufacturer: String,
    pub supplier: String,
    pub manufacture_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub location: Location,
    pub min_threshold: i64,
    pub max_threshold: i64,
    pub storage_condition: StorageCondition,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub qr_code: Option<String>,
    pub stock_status: StockStatus,
    pub days_to_expiry: i64,
    pub is_expired: bool,
    pub created_by: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DrugResponse {
    pub fn from_drug(drug: Drug, today: NaiveDate) -> Self {
        let days_to_expiry = drug.days_to_expiry(today);
        DrugResponse {
            id: hex(&drug.id),
            drug_id: drug.drug_id,
            name: drug.name,
            generic_name: drug.generic_name,
            category: drug.category,
            batch_no: drug.batch_no,
            quantity: drug.quantity,
            unit: drug.unit,
            price: drug.price,
            manufacturer: drug.manufacturer,
            supplier: drug.supplier,
            manufacture_date: drug.manufacture_date,
            expiry_date: drug.expiry_date,
            location: drug.location,
            min_threshold: drug.min_threshold,
            max_threshold: drug.max_threshold,
            storage_condition: drug.storage_condition,
            description: drug.description,
            image_url: drug.image_url,
            qr_code: drug.qr_code,
            stock_status: drug.stock_status,
            days_to_expiry,
            is_expired: days_to_expiry <= 0,
            created_by: hex_opt(&drug.created_by),
            created_at: drug.created_at,
            updated_at: drug.updated_at,
        }
    }

    pub fn from_drugs(drugs: Vec<Drug>, today: NaiveDate) -> Vec<Self> {
        drugs.into_iter().map(|drug| DrugResponse::from_drug(drug, today)).collect()
    }
}

#[derive(Debug, Serialize)]
pub struct DrugEnvelope {
    pub success: bool,
    pub drug: DrugResponse,
}

#[derive(Debug, Serialize)]
pub struct DrugListResponse {
    pub success: bool,
    pub drugs: Vec<DrugResponse>,
    pub total: u64,
    pub page: u64,
    pub pages: u64,
}

#[derive(Debug, Serialize)]
pub struct DrugsEnvelope {
    pub success: bool,
    pub count: usize,
    pub drugs: Vec<DrugResponse>,
}

#[derive(Debug, Serialize)]
pub struct ScanDrugResponse {
    pub success: bool,
    pub drug: DrugResponse,
    pub verified: bool,
    pub expired: bool,
    pub message: String,
}

/// Per-bucket totals used by inventory stats and reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockBucket {
    pub count: u64,
    pub quantity: i64,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStats {
    pub total_drugs: u64,
    pub total_quantity: i64,
    pub total_value: f64,
    pub low_stock: u64,
    pub out_of_stock: u64,
    pub expiring_soon: u64,
    pub expired: u64,
    pub by_category: BTreeMap<String, StockBucket>,
    pub by_location: BTreeMap<String, StockBucket>,
}

/// Payload of the `stockUpdate` event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdate {
    #[serde(rename = "_id")]
    pub id: String,
    pub drug_id: String,
    pub name: String,
    pub batch_no: String,
    pub location: Location,
    pub quantity: i64,
    pub stock_status: StockStatus,
}

impl From<&Drug> for StockUpdate {
    fn from(drug: &Drug) -> Self {
        StockUpdate {
            id: hex(&drug.id),
            drug_id: drug.drug_id.clone(),
            name: drug.name.clone(),
            batch_no: drug.batch_no.clone(),
            location: drug.location,
            quantity: drug.quantity,
            stock_status: drug.stock_status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DrugStatsEnvelope {
    pub success: bool,
    pub stats: InventoryStats,
}
