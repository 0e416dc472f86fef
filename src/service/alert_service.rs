use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{Days, NaiveDate, Utc};
use tracing::{debug, error, info, instrument};

use crate::config::AlertConfig;
use crate::dto::alert_dto::{AlertListResponse, AlertResponse, AlertStats, CreateAlertRequest, MAX_EXPIRY_WINDOW_DAYS};
use crate::model::alert::{Alert, AlertType, Severity};
use crate::model::drug::{Drug, StockStatus};
use crate::model::user::Actor;
use crate::repository::alert_repo::AlertRepository;
use crate::repository::drug_repo::DrugRepository;
use crate::repository::filters::{AlertFilter, DrugFilter, Page};
use crate::service::notification_hub::{NotificationHub, NEW_ALERT};
use crate::util::error::{ServiceError, ServiceResult};
use crate::util::ids::parse_object_id;

const STOCK_ALERTS: [AlertType; 2] = [AlertType::LowStock, AlertType::OutOfStock];

/// Last expiry date that falls within `days` of `today`.
pub fn expiry_cutoff(today: NaiveDate, days: i64) -> ServiceResult<NaiveDate> {
    if !(0..=MAX_EXPIRY_WINDOW_DAYS).contains(&days) {
        return Err(ServiceError::InvalidInput(format!(
            "days must be between 0 and {}",
            MAX_EXPIRY_WINDOW_DAYS
        )));
    }
    today
        .checked_add_days(Days::new(days.unsigned_abs()))
        .ok_or_else(|| ServiceError::InvalidInput("days reaches past the supported calendar".to_string()))
}

/// Alert a drug's stock level warrants, if any.
pub fn evaluate_stock(drug: &Drug) -> Option<Alert> {
    let alert = match drug.stock_status {
        StockStatus::InStock => return None,
        StockStatus::OutOfStock => Alert::new(
            AlertType::OutOfStock,
            Severity::Critical,
            format!("Out of stock: {}", drug.name),
            format!(
                "{} (batch {}) at {} is out of stock",
                drug.name, drug.batch_no, drug.location
            ),
        ),
        StockStatus::LowStock => Alert::new(
            AlertType::LowStock,
            Severity::Warning,
            format!("Low stock: {}", drug.name),
            format!(
                "{} (batch {}) at {} has {} left, threshold is {}",
                drug.name, drug.batch_no, drug.location, drug.quantity, drug.min_threshold
            ),
        ),
    };
    Some(alert.for_drug(drug.id))
}

/// Alert a drug's expiry date warrants on `today`, if any.
pub fn evaluate_expiry(drug: &Drug, today: NaiveDate, warning_days: i64, critical_days: i64) -> Option<Alert> {
    let days = drug.days_to_expiry(today);
    let alert = if days <= 0 {
        Alert::new(
            AlertType::Expired,
            Severity::Critical,
            format!("Expired: {}", drug.name),
            format!("Batch {} of {} expired on {}", drug.batch_no, drug.name, drug.expiry_date),
        )
    } else if days <= warning_days {
        let severity = if days <= critical_days { Severity::Critical } else { Severity::Warning };
        Alert::new(
            AlertType::Expiring,
            severity,
            format!("Expiring soon: {}", drug.name),
            format!(
                "Batch {} of {} expires in {} days ({})",
                drug.batch_no, drug.name, days, drug.expiry_date
            ),
        )
    } else {
        return None;
    };
    Some(alert.for_drug(drug.id))
}

#[async_trait]
pub trait AlertService: Send + Sync {
    async fn list(&self, filter: AlertFilter, page: Page) -> ServiceResult<AlertListResponse>;
    async fn mark_read(&self, id: &str) -> ServiceResult<Alert>;
    async fn mark_all_read(&self) -> ServiceResult<u64>;
    async fn resolve(&self, id: &str, actor: &Actor) -> ServiceResult<Alert>;
    async fn create_manual(&self, request: CreateAlertRequest) -> ServiceResult<Alert>;
    /// Stores the alert and broadcasts it as `newAlert`.
    async fn raise(&self, alert: Alert) -> ServiceResult<Alert>;
    /// Drugs expiring within `days` (expired included), soonest first.
    async fn expiring_drugs(&self, days: i64) -> ServiceResult<Vec<Drug>>;
    async fn low_stock_drugs(&self) -> ServiceResult<Vec<Drug>>;
    /// Raises or resolves stock alerts after a drug's quantity changed.
    async fn check_stock(&self, drug: &Drug) -> ServiceResult<Option<Alert>>;
    async fn check_expiry(&self, drug: &Drug, today: NaiveDate) -> ServiceResult<Option<Alert>>;
    async fn run_stock_scan(&self) -> ServiceResult<usize>;
    async fn run_expiry_scan(&self) -> ServiceResult<usize>;
    async fn stats(&self) -> ServiceResult<AlertStats>;
}

pub struct AlertServiceImpl {
    pub alert_repo: Arc<dyn AlertRepository>,
    pub drug_repo: Arc<dyn DrugRepository>,
    pub hub: Arc<NotificationHub>,
    pub config: AlertConfig,
}

impl AlertServiceImpl {
    pub fn new(
        alert_repo: Arc<dyn AlertRepository>,
        drug_repo: Arc<dyn DrugRepository>,
        hub: Arc<NotificationHub>,
        config: AlertConfig,
    ) -> Self {
        Self { alert_repo, drug_repo, hub, config }
    }

    /// Creates `alert` unless the drug already has an open one of the same type.
    async fn raise_once(&self, drug_id: ObjectId, alert: Alert) -> ServiceResult<Option<Alert>> {
        if self.alert_repo.find_open(drug_id, alert.alert_type).await?.is_some() {
            debug!(drug = %drug_id, alert_type = alert.alert_type.as_str(), "Open alert exists, skipping");
            return Ok(None);
        }
        self.raise(alert).await.map(Some)
    }
}

#[async_trait]
impl AlertService for AlertServiceImpl {
    #[instrument(skip(self))]
    async fn list(&self, filter: AlertFilter, page: Page) -> ServiceResult<AlertListResponse> {
        let (alerts, total) = self.alert_repo.list(&filter, page).await?;
        let unread_count = self
            .alert_repo
            .count(&AlertFilter { is_read: Some(false), ..Default::default() })
            .await?;
        Ok(AlertListResponse {
            success: true,
            alerts: alerts.into_iter().map(AlertResponse::from).collect(),
            total,
            unread_count,
            page: page.page,
            pages: page.pages(total),
        })
    }

    #[instrument(skip(self))]
    async fn mark_read(&self, id: &str) -> ServiceResult<Alert> {
        let id = parse_object_id(id, "alert")?;
        Ok(self.alert_repo.mark_read(id).await?)
    }

    #[instrument(skip(self))]
    async fn mark_all_read(&self) -> ServiceResult<u64> {
        let modified = self.alert_repo.mark_all_read().await?;
        info!(modified, "Marked all alerts as read");
        Ok(modified)
    }

    #[instrument(skip(self, actor), fields(user = %actor.id))]
    async fn resolve(&self, id: &str, actor: &Actor) -> ServiceResult<Alert> {
        let id = parse_object_id(id, "alert")?;
        let alert = self.alert_repo.resolve(id, Some(actor.id)).await?;
        info!(alert = %id, "Alert resolved");
        Ok(alert)
    }

    #[instrument(skip(self, request), fields(alert_type = request.alert_type.as_str()))]
    async fn create_manual(&self, request: CreateAlertRequest) -> ServiceResult<Alert> {
        let drug = request.drug.as_deref().map(|id| parse_object_id(id, "drug")).transpose()?;
        let movement = request.movement.as_deref().map(|id| parse_object_id(id, "movement")).transpose()?;
        if let Some(drug) = drug {
            self.drug_repo.get_by_id(drug).await?;
        }
        let alert = Alert::new(
            request.alert_type,
            request.severity.unwrap_or(Severity::Info),
            request.title.trim(),
            request.message.trim(),
        )
        .for_drug(drug)
        .for_movement(movement);
        self.raise(alert).await
    }

    async fn raise(&self, alert: Alert) -> ServiceResult<Alert> {
        let created = self.alert_repo.create(alert).await.map_err(|e| {
            error!("Failed to store alert: {}", e);
            ServiceError::from(e)
        })?;
        info!(
            alert_type = created.alert_type.as_str(),
            severity = created.severity.as_str(),
            "Alert raised"
        );
        self.hub.broadcast(NEW_ALERT, &AlertResponse::from(created.clone()));
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn expiring_drugs(&self, days: i64) -> ServiceResult<Vec<Drug>> {
        let cutoff = expiry_cutoff(Utc::now().date_naive(), days)?;
        let filter = DrugFilter { expiring_on_or_before: Some(cutoff), ..Default::default() };
        Ok(self.drug_repo.all(&filter).await?)
    }

    #[instrument(skip(self))]
    async fn low_stock_drugs(&self) -> ServiceResult<Vec<Drug>> {
        let filter = DrugFilter {
            stock_statuses: vec![StockStatus::LowStock, StockStatus::OutOfStock],
            ..Default::default()
        };
        Ok(self.drug_repo.all(&filter).await?)
    }

    #[instrument(skip(self, drug), fields(drug = ?drug.id, status = drug.stock_status.as_str()))]
    async fn check_stock(&self, drug: &Drug) -> ServiceResult<Option<Alert>> {
        let Some(drug_id) = drug.id else {
            return Ok(None);
        };
        let Some(alert) = evaluate_stock(drug) else {
            let resolved = self.alert_repo.resolve_open_for_drug(drug_id, &STOCK_ALERTS, None).await?;
            if resolved > 0 {
                info!(resolved, "Drug back in stock, stock alerts resolved");
            }
            return Ok(None);
        };
        let stale: Vec<AlertType> = STOCK_ALERTS.into_iter().filter(|t| *t != alert.alert_type).collect();
        self.alert_repo.resolve_open_for_drug(drug_id, &stale, None).await?;
        self.raise_once(drug_id, alert).await
    }

    #[instrument(skip(self, drug), fields(drug = ?drug.id))]
    async fn check_expiry(&self, drug: &Drug, today: NaiveDate) -> ServiceResult<Option<Alert>> {
        let Some(drug_id) = drug.id else {
            return Ok(None);
        };
        let Some(alert) = evaluate_expiry(drug, today, self.config.expiry_warning_days, self.config.critical_expiry_days)
        else {
            return Ok(None);
        };
        if alert.alert_type == AlertType::Expired {
            self.alert_repo.resolve_open_for_drug(drug_id, &[AlertType::Expiring], None).await?;
        }
        self.raise_once(drug_id, alert).await
    }

    #[instrument(skip(self))]
    async fn run_stock_scan(&self) -> ServiceResult<usize> {
        let drugs = self.drug_repo.all(&DrugFilter::default()).await?;
        let mut raised = 0;
        for drug in &drugs {
            match self.check_stock(drug).await {
                Ok(Some(_)) => raised += 1,
                Ok(None) => {}
                Err(e) => error!(drug = ?drug.id, "Stock check failed: {}", e),
            }
        }
        info!(scanned = drugs.len(), raised, "Stock scan finished");
        Ok(raised)
    }

    #[instrument(skip(self))]
    async fn run_expiry_scan(&self) -> ServiceResult<usize> {
        let today = Utc::now().date_naive();
        let filter = DrugFilter {
            expiring_on_or_before: Some(expiry_cutoff(today, self.config.expiry_warning_days)?),
            ..Default::default()
        };
        let drugs = self.drug_repo.all(&filter).await?;
        let mut raised = 0;
        for drug in &drugs {
            match self.check_expiry(drug, today).await {
                Ok(Some(_)) => raised += 1,
                Ok(None) => {}
                Err(e) => error!(drug = ?drug.id, "Expiry check failed: {}", e),
            }
        }
        info!(scanned = drugs.len(), raised, "Expiry scan finished");
        Ok(raised)
    }

    async fn stats(&self) -> ServiceResult<AlertStats> {
        let total = self.alert_repo.count(&AlertFilter::default()).await?;
        let unread = self
            .alert_repo
            .count(&AlertFilter { is_read: Some(false), ..Default::default() })
            .await?;
        let unresolved = self
            .alert_repo
            .count(&AlertFilter { is_resolved: Some(false), ..Default::default() })
            .await?;
        let critical = self
            .alert_repo
            .count(&AlertFilter {
                severity: Some(Severity::Critical),
                is_resolved: Some(false),
                ..Default::default()
            })
            .await?;
        Ok(AlertStats { total, unread, unresolved, critical })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::model::drug::{DrugCategory, DrugUnit, Location, StorageCondition};

    fn drug(quantity: i64, expiry: NaiveDate) -> Drug {
        let mut drug = Drug {
            id: Some(ObjectId::new()),
            drug_id: "DRG-TEST0001".into(),
            name: "Amoxicillin".into(),
            generic_name: None,
            category: DrugCategory::Antibiotics,
            batch_no: "AMX-1".into(),
            quantity,
            unit: DrugUnit::Capsules,
            price: 1.5,
            manufacturer: "Acme".into(),
            supplier: "MedSupply".into(),
            manufacture_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            expiry_date: expiry,
            location: Location::CentralWarehouse,
            min_threshold: 50,
            max_threshold: 1000,
            storage_condition: StorageCondition::RoomTemperature,
            description: None,
            image_url: None,
            qr_code: None,
            stock_status: StockStatus::InStock,
            created_by: None,
            created_at: None,
            updated_at: None,
        };
        drug.refresh_stock_status();
        drug
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn test_stock_evaluation() {
        let far = today() + Duration::days(400);
        assert!(evaluate_stock(&drug(200, far)).is_none());

        let low = evaluate_stock(&drug(10, far)).unwrap();
        assert_eq!(low.alert_type, AlertType::LowStock);
        assert_eq!(low.severity, Severity::Warning);
        assert!(low.drug.is_some());

        let out = evaluate_stock(&drug(0, far)).unwrap();
        assert_eq!(out.alert_type, AlertType::OutOfStock);
        assert_eq!(out.severity, Severity::Critical);
    }

    #[test]
    fn test_expiry_cutoff_bounds() {
        assert_eq!(expiry_cutoff(today(), 0).unwrap(), today());
        assert_eq!(expiry_cutoff(today(), 10).unwrap(), today() + Duration::days(10));
        assert!(expiry_cutoff(today(), MAX_EXPIRY_WINDOW_DAYS).is_ok());
        assert!(expiry_cutoff(today(), MAX_EXPIRY_WINDOW_DAYS + 1).is_err());
        assert!(expiry_cutoff(today(), -1).is_err());
        assert!(expiry_cutoff(NaiveDate::MAX, 1).is_err());
    }

    #[test]
    fn test_expiry_evaluation_windows() {
        let at = |days: i64| evaluate_expiry(&drug(100, today() + Duration::days(days)), today(), 90, 30);

        assert!(at(120).is_none());

        let warning = at(60).unwrap();
        assert_eq!((warning.alert_type, warning.severity), (AlertType::Expiring, Severity::Warning));

        let critical = at(30).unwrap();
        assert_eq!((critical.alert_type, critical.severity), (AlertType::Expiring, Severity::Critical));

        let expired = at(0).unwrap();
        assert_eq!((expired.alert_type, expired.severity), (AlertType::Expired, Severity::Critical));
        assert_eq!(at(-5).unwrap().alert_type, AlertType::Expired);
    }
}
