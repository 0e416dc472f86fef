//! Query filters shared by the Mongo repositories and any other store.
//!
//! Each filter renders itself as a BSON query document and can also be
//! evaluated against a single document. The two must agree.

use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, NaiveDate, Utc};

use crate::model::alert::{Alert, AlertType, Severity};
use crate::model::drug::{Drug, DrugCategory, Location, StockStatus};
use crate::model::movement::{Movement, MovementStatus, Priority};
use crate::util::timestamp;

/// Normalised page/limit pair. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub limit: u64,
}

impl Page {
    pub const DEFAULT_LIMIT: u64 = 20;
    pub const MAX_LIMIT: u64 = 100;

    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        let page = page.unwrap_or(1).max(1) as u64;
        let limit = limit
            .map(|l| l as u64)
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT);
        Page { page, limit }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1) * self.limit
    }

    pub fn pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new(None, None)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DrugFilter {
    pub search: Option<String>,
    pub category: Option<DrugCategory>,
    pub location: Option<Location>,
    pub stock_statuses: Vec<StockStatus>,
    /// Only drugs whose expiry date is on or before this day.
    pub expiring_on_or_before: Option<NaiveDate>,
}

impl DrugFilter {
    pub fn to_document(&self) -> Document {
        let mut filter = doc! {};
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = regex::escape(search);
            let clauses: Vec<Document> = ["name", "genericName", "batchNo", "drugId"]
                .iter()
                .map(|field| doc! { *field: { "$regex": &pattern, "$options": "i" } })
                .collect();
            filter.insert("$or", clauses);
        }
        if let Some(category) = self.category {
            filter.insert("category", category.as_str());
        }
        if let Some(location) = self.location {
            filter.insert("location", location.as_str());
        }
        match self.stock_statuses.as_slice() {
            [] => {}
            [single] => {
                filter.insert("stockStatus", single.as_str());
            }
            many => {
                let values: Vec<&str> = many.iter().map(StockStatus::as_str).collect();
                filter.insert("stockStatus", doc! { "$in": values });
            }
        }
        if let Some(day) = self.expiring_on_or_before {
            filter.insert("expiryDate", doc! { "$lte": day.format("%Y-%m-%d").to_string() });
        }
        filter
    }

    pub fn matches(&self, drug: &Drug) -> bool {
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let hit = [
                Some(drug.name.as_str()),
                drug.generic_name.as_deref(),
                Some(drug.batch_no.as_str()),
                Some(drug.drug_id.as_str()),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if self.category.is_some_and(|c| c != drug.category) {
            return false;
        }
        if self.location.is_some_and(|l| l != drug.location) {
            return false;
        }
        if !self.stock_statuses.is_empty() && !self.stock_statuses.contains(&drug.stock_status) {
            return false;
        }
        if self.expiring_on_or_before.is_some_and(|day| drug.expiry_date > day) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    pub status: Option<MovementStatus>,
    pub priority: Option<Priority>,
    pub from: Option<Location>,
    pub to: Option<Location>,
    /// Matches movements leaving or arriving at this location.
    pub location: Option<Location>,
    pub driver: Option<ObjectId>,
    pub drug: Option<ObjectId>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

impl MovementFilter {
    pub fn to_document(&self) -> Document {
        let mut filter = doc! {};
        if let Some(status) = self.status {
            filter.insert("status", status.as_str());
        }
        if let Some(priority) = self.priority {
            filter.insert("priority", priority.as_str());
        }
        if let Some(from) = self.from {
            filter.insert("from", from.as_str());
        }
        if let Some(to) = self.to {
            filter.insert("to", to.as_str());
        }
        if let Some(location) = self.location {
            filter.insert(
                "$or",
                vec![doc! { "from": location.as_str() }, doc! { "to": location.as_str() }],
            );
        }
        if let Some(driver) = self.driver {
            filter.insert("driver", driver);
        }
        if let Some(drug) = self.drug {
            filter.insert("drug", drug);
        }
        let mut created = doc! {};
        if let Some(start) = self.created_from {
            created.insert("$gte", timestamp_key(&start));
        }
        if let Some(end) = self.created_before {
            created.insert("$lt", timestamp_key(&end));
        }
        if !created.is_empty() {
            filter.insert("createdAt", created);
        }
        filter
    }

    pub fn matches(&self, movement: &Movement) -> bool {
        if self.status.is_some_and(|s| s != movement.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != movement.priority) {
            return false;
        }
        if self.from.is_some_and(|l| l != movement.from) || self.to.is_some_and(|l| l != movement.to) {
            return false;
        }
        if self.location.is_some_and(|l| l != movement.from && l != movement.to) {
            return false;
        }
        if self.driver.is_some() && self.driver != movement.driver {
            return false;
        }
        if self.drug.is_some_and(|d| d != movement.drug) {
            return false;
        }
        let created = movement.created_at;
        if let Some(start) = self.created_from {
            if created.map_or(true, |c| c < start) {
                return false;
            }
        }
        if let Some(end) = self.created_before {
            if created.map_or(true, |c| c >= end) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub alert_type: Option<AlertType>,
    pub severity: Option<Severity>,
    pub is_read: Option<bool>,
    pub is_resolved: Option<bool>,
}

impl AlertFilter {
    pub fn to_document(&self) -> Document {
        let mut filter = doc! {};
        if let Some(alert_type) = self.alert_type {
            filter.insert("type", alert_type.as_str());
        }
        if let Some(severity) = self.severity {
            filter.insert("severity", severity.as_str());
        }
        if let Some(is_read) = self.is_read {
            filter.insert("isRead", is_read);
        }
        if let Some(is_resolved) = self.is_resolved {
            filter.insert("isResolved", is_resolved);
        }
        filter
    }

    pub fn matches(&self, alert: &Alert) -> bool {
        self.alert_type.map_or(true, |t| t == alert.alert_type)
            && self.severity.map_or(true, |s| s == alert.severity)
            && self.is_read.map_or(true, |r| r == alert.is_read)
            && self.is_resolved.map_or(true, |r| r == alert.is_resolved)
    }
}

/// The stored form of `at`, comparable against `createdAt`/`updatedAt` fields.
pub fn timestamp_key(at: &DateTime<Utc>) -> String {
    timestamp::format(at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_normalisation() {
        let page = Page::new(Some(0), Some(500));
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, Page::MAX_LIMIT);
        assert_eq!(Page::new(Some(3), Some(10)).skip(), 20);
        assert_eq!(Page::new(None, Some(10)).pages(21), 3);
        assert_eq!(Page::default().pages(0), 0);
    }

    #[test]
    fn test_drug_filter_document() {
        let filter = DrugFilter {
            search: Some("amoxi.cillin".to_string()),
            category: Some(DrugCategory::Antibiotics),
            stock_statuses: vec![StockStatus::LowStock, StockStatus::OutOfStock],
            ..Default::default()
        };
        let doc = filter.to_document();
        assert_eq!(doc.get_str("category").unwrap(), "antibiotics");
        let or = doc.get_array("$or").unwrap();
        assert_eq!(or.len(), 4);
        let first = or[0].as_document().unwrap().get_document("name").unwrap();
        assert_eq!(first.get_str("$regex").unwrap(), "amoxi\\.cillin");
        assert!(doc.get_document("stockStatus").unwrap().contains_key("$in"));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let filter = DrugFilter {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(filter.to_document().is_empty());
    }

    #[test]
    fn test_movement_filter_location_matches_either_end() {
        let filter = MovementFilter {
            location: Some(Location::CityHospital),
            ..Default::default()
        };
        let doc = filter.to_document();
        assert_eq!(doc.get_array("$or").unwrap().len(), 2);
    }

    #[test]
    fn test_created_range_bounds_use_stored_timestamp_form() {
        use chrono::TimeZone;
        let filter = MovementFilter {
            created_from: Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()),
            created_before: Some(Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        let created = filter.to_document().get_document("createdAt").unwrap().clone();
        assert_eq!(created.get_str("$gte").unwrap(), "2025-03-01T00:00:00.000Z");
        assert_eq!(created.get_str("$lt").unwrap(), "2025-03-02T00:00:00.000Z");
        // A whole-second stamp stored the same way sorts before a fractional one
        assert!(created.get_str("$gte").unwrap() < "2025-03-01T00:00:00.500Z");
    }

    #[test]
    fn test_alert_filter_document() {
        let filter = AlertFilter {
            is_read: Some(false),
            severity: Some(Severity::Critical),
            ..Default::default()
        };
        let doc = filter.to_document();
        assert_eq!(doc.get_bool("isRead").unwrap(), false);
        assert_eq!(doc.get_str("severity").unwrap(), "critical");
    }
}
