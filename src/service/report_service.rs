//! Inventory, movement, expiry and consumption reporting.
//!
//! Aggregation is done by the pure functions below over documents fetched
//! through the repositories, so they can be tested without a database.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::instrument;

use crate::dto::alert_dto::DEFAULT_EXPIRY_WINDOW_DAYS;
use crate::dto::drug_dto::{DrugResponse, InventoryStats, StockBucket};
use crate::dto::movement_dto::{MovementResponse, MovementStats};
use crate::dto::report_dto::{
    ConsumptionItem, ConsumptionReport, ConsumptionReportQuery, ConsumptionSummary, DashboardStats,
    ExpiryItem, ExpiryReport, ExpiryReportQuery, ExpirySummary, InventoryBreakdown, InventoryReport,
    InventoryReportQuery, InventorySummary, MovementReport, MovementReportQuery, MovementSummary, NoExtras,
    Report, DEFAULT_EXPIRY_REPORT_DAYS,
};
use crate::model::drug::{Drug, StockStatus};
use crate::model::movement::{Movement, MovementStatus};
use crate::repository::drug_repo::DrugRepository;
use crate::repository::filters::{DrugFilter, MovementFilter};
use crate::repository::movement_repo::MovementRepository;
use crate::service::alert_service::{expiry_cutoff, AlertService};
use crate::util::error::{ServiceError, ServiceResult};

fn add_to_bucket(buckets: &mut BTreeMap<String, StockBucket>, key: &str, drug: &Drug) {
    let bucket = buckets.entry(key.to_string()).or_default();
    bucket.count += 1;
    bucket.quantity += drug.quantity;
    bucket.value += drug.stock_value();
}

pub fn inventory_stats(drugs: &[Drug], today: NaiveDate) -> InventoryStats {
    let mut stats = InventoryStats::default();
    for drug in drugs {
        stats.total_drugs += 1;
        stats.total_quantity += drug.quantity;
        stats.total_value += drug.stock_value();
        match drug.stock_status {
            StockStatus::LowStock => stats.low_stock += 1,
            StockStatus::OutOfStock => stats.out_of_stock += 1,
            StockStatus::InStock => {}
        }
        let days = drug.days_to_expiry(today);
        if days <= 0 {
            stats.expired += 1;
        } else if days <= DEFAULT_EXPIRY_WINDOW_DAYS {
            stats.expiring_soon += 1;
        }
        add_to_bucket(&mut stats.by_category, drug.category.as_str(), drug);
        add_to_bucket(&mut stats.by_location, drug.location.as_str(), drug);
    }
    stats
}

pub fn movement_stats(movements: &[Movement]) -> MovementStats {
    let mut stats = MovementStats::default();
    for movement in movements {
        stats.total += 1;
        let counter = match movement.status {
            MovementStatus::Pending => &mut stats.pending,
            MovementStatus::Approved => &mut stats.approved,
            MovementStatus::InTransit => &mut stats.in_transit,
            MovementStatus::Delivered => &mut stats.delivered,
            MovementStatus::Rejected => &mut stats.rejected,
            MovementStatus::Cancelled => &mut stats.cancelled,
        };
        *counter += 1;
        *stats.by_priority.entry(movement.priority.as_str().to_string()).or_default() += 1;
    }
    stats
}

pub fn inventory_report(drugs: Vec<Drug>, filters: InventoryReportQuery, today: NaiveDate) -> InventoryReport {
    let mut summary = InventorySummary::default();
    let mut breakdown = InventoryBreakdown::default();
    for drug in &drugs {
        summary.total_items += 1;
        summary.total_quantity += drug.quantity;
        summary.total_value += drug.stock_value();
        match drug.stock_status {
            StockStatus::LowStock => summary.low_stock += 1,
            StockStatus::OutOfStock => summary.out_of_stock += 1,
            StockStatus::InStock => {}
        }
        add_to_bucket(&mut breakdown.by_location, drug.location.as_str(), drug);
        add_to_bucket(&mut breakdown.by_category, drug.category.as_str(), drug);
    }
    Report {
        report_type: "inventory",
        generated_at: Utc::now(),
        filters,
        summary,
        items: DrugResponse::from_drugs(drugs, today),
        extras: breakdown,
    }
}

pub fn movement_report(movements: Vec<Movement>, filters: MovementReportQuery) -> MovementReport {
    let mut summary = MovementSummary::default();
    for movement in &movements {
        summary.total += 1;
        summary.total_quantity += movement.quantity;
        *summary.by_status.entry(movement.status.as_str().to_string()).or_default() += 1;
        *summary.by_priority.entry(movement.priority.as_str().to_string()).or_default() += 1;
    }
    Report {
        report_type: "movement",
        generated_at: Utc::now(),
        filters,
        summary,
        items: movements.into_iter().map(MovementResponse::from).collect(),
        extras: NoExtras::default(),
    }
}

/// Drugs expiring within `filters.days` of `today`, expired ones included.
pub fn expiry_report(drugs: Vec<Drug>, filters: ExpiryReportQuery, today: NaiveDate) -> ExpiryReport {
    let window = filters.days.unwrap_or(DEFAULT_EXPIRY_REPORT_DAYS);
    let mut summary = ExpirySummary::default();
    let mut items: Vec<ExpiryItem> = drugs
        .into_iter()
        .filter_map(|drug| {
            let days = drug.days_to_expiry(today);
            if days > window {
                return None;
            }
            match days {
                d if d <= 0 => summary.expired += 1,
                1..=30 => summary.within30 += 1,
                31..=60 => summary.within60 += 1,
                61..=90 => summary.within90 += 1,
                _ => {}
            }
            let value_at_risk = drug.stock_value();
            summary.total_value_at_risk += value_at_risk;
            Some(ExpiryItem {
                id: drug.id.map(|id| id.to_hex()).unwrap_or_default(),
                drug_id: drug.drug_id,
                name: drug.name,
                batch_no: drug.batch_no,
                location: drug.location,
                quantity: drug.quantity,
                expiry_date: drug.expiry_date,
                days_to_expiry: days,
                value_at_risk,
            })
        })
        .collect();
    items.sort_by_key(|item| item.days_to_expiry);
    Report {
        report_type: "expiry",
        generated_at: Utc::now(),
        filters,
        summary,
        items,
        extras: NoExtras::default(),
    }
}

/// Delivered movements aggregated per drug, largest quantity first.
pub fn consumption_report(movements: Vec<Movement>, filters: ConsumptionReportQuery) -> ConsumptionReport {
    let mut per_drug: BTreeMap<String, ConsumptionItem> = BTreeMap::new();
    let mut summary = ConsumptionSummary::default();
    for movement in movements.iter().filter(|m| m.status == MovementStatus::Delivered) {
        summary.total_quantity += movement.quantity;
        summary.movement_count += 1;
        let item = per_drug.entry(movement.drug.to_hex()).or_insert_with(|| ConsumptionItem {
            drug: movement.drug.to_hex(),
            drug_name: movement.drug_name.clone(),
            batch_no: movement.batch_no.clone(),
            quantity: 0,
            movement_count: 0,
        });
        item.quantity += movement.quantity;
        item.movement_count += 1;
    }
    summary.drug_count = per_drug.len() as u64;
    let mut items: Vec<ConsumptionItem> = per_drug.into_values().collect();
    items.sort_by(|a, b| b.quantity.cmp(&a.quantity).then_with(|| a.drug_name.cmp(&b.drug_name)));
    Report {
        report_type: "consumption",
        generated_at: Utc::now(),
        filters,
        summary,
        items,
        extras: NoExtras::default(),
    }
}

/// Half-open `[start, end + 1 day)` range over creation time.
fn created_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> ServiceResult<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(ServiceError::InvalidInput("endDate must not be before startDate".to_string()));
        }
    }
    let at_midnight = |day: NaiveDate| day.and_time(NaiveTime::MIN).and_utc();
    let end = end
        .map(|day| day.succ_opt().ok_or_else(|| ServiceError::InvalidInput("endDate is out of range".to_string())))
        .transpose()?;
    Ok((start.map(at_midnight), end.map(at_midnight)))
}

#[async_trait]
pub trait ReportService: Send + Sync {
    async fn dashboard(&self) -> ServiceResult<DashboardStats>;
    async fn inventory(&self, query: InventoryReportQuery) -> ServiceResult<InventoryReport>;
    async fn movement(&self, query: MovementReportQuery) -> ServiceResult<MovementReport>;
    async fn expiry(&self, query: ExpiryReportQuery) -> ServiceResult<ExpiryReport>;
    async fn consumption(&self, query: ConsumptionReportQuery) -> ServiceResult<ConsumptionReport>;
}

pub struct ReportServiceImpl {
    pub drug_repo: Arc<dyn DrugRepository>,
    pub movement_repo: Arc<dyn MovementRepository>,
    pub alert_service: Arc<dyn AlertService>,
}

impl ReportServiceImpl {
    pub fn new(
        drug_repo: Arc<dyn DrugRepository>,
        movement_repo: Arc<dyn MovementRepository>,
        alert_service: Arc<dyn AlertService>,
    ) -> Self {
        Self { drug_repo, movement_repo, alert_service }
    }
}

#[async_trait]
impl ReportService for ReportServiceImpl {
    #[instrument(skip(self))]
    async fn dashboard(&self) -> ServiceResult<DashboardStats> {
        let drugs = self.drug_repo.all(&DrugFilter::default()).await?;
        let movements = self.movement_repo.all(&MovementFilter::default()).await?;
        Ok(DashboardStats {
            inventory: inventory_stats(&drugs, Utc::now().date_naive()),
            movements: movement_stats(&movements),
            alerts: self.alert_service.stats().await?,
        })
    }

    #[instrument(skip(self))]
    async fn inventory(&self, query: InventoryReportQuery) -> ServiceResult<InventoryReport> {
        let filter = DrugFilter {
            category: query.category,
            location: query.location,
            stock_statuses: query.status.into_iter().collect(),
            ..Default::default()
        };
        let drugs = self.drug_repo.all(&filter).await?;
        Ok(inventory_report(drugs, query, Utc::now().date_naive()))
    }

    #[instrument(skip(self))]
    async fn movement(&self, query: MovementReportQuery) -> ServiceResult<MovementReport> {
        let (created_from, created_before) = created_range(query.start_date, query.end_date)?;
        let filter = MovementFilter {
            status: query.status,
            location: query.location,
            created_from,
            created_before,
            ..Default::default()
        };
        let movements = self.movement_repo.all(&filter).await?;
        Ok(movement_report(movements, query))
    }

    #[instrument(skip(self))]
    async fn expiry(&self, query: ExpiryReportQuery) -> ServiceResult<ExpiryReport> {
        let days = query.days.unwrap_or(DEFAULT_EXPIRY_REPORT_DAYS);
        let today = Utc::now().date_naive();
        let filter = DrugFilter { expiring_on_or_before: Some(expiry_cutoff(today, days)?), ..Default::default() };
        let drugs = self.drug_repo.all(&filter).await?;
        Ok(expiry_report(drugs, ExpiryReportQuery { days: Some(days) }, today))
    }

    #[instrument(skip(self))]
    async fn consumption(&self, query: ConsumptionReportQuery) -> ServiceResult<ConsumptionReport> {
        let (created_from, created_before) = created_range(query.start_date, query.end_date)?;
        let filter = MovementFilter {
            status: Some(MovementStatus::Delivered),
            location: query.location,
            created_from,
            created_before,
            ..Default::default()
        };
        let movements = self.movement_repo.all(&filter).await?;
        Ok(consumption_report(movements, query))
    }
}
