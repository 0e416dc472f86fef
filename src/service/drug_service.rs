use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{NaiveDate, Utc};
use tracing::{error, info, instrument, warn};

use crate::dto::drug_dto::{
    CreateDrugRequest, DrugListResponse, DrugResponse, InventoryStats, ScanDrugRequest, ScanDrugResponse,
    StockUpdate, UpdateDrugRequest, DEFAULT_MAX_THRESHOLD, DEFAULT_MIN_THRESHOLD,
};
use crate::model::drug::{Drug, StockStatus};
use crate::model::user::Actor;
use crate::repository::drug_repo::{DrugRepository, QuantityEdit};
use crate::repository::filters::{DrugFilter, Page};
use crate::service::alert_service::AlertService;
use crate::service::notification_hub::{NotificationHub, STOCK_UPDATE};
use crate::service::report_service::inventory_stats;
use crate::util::error::{ServiceError, ServiceResult};
use crate::util::ids::{drug_code, parse_object_id};
use crate::util::qr;

#[async_trait]
pub trait DrugService: Send + Sync {
    async fn list(&self, filter: DrugFilter, page: Page) -> ServiceResult<DrugListResponse>;
    async fn stats(&self) -> ServiceResult<InventoryStats>;
    async fn get(&self, id: &str) -> ServiceResult<Drug>;
    /// Looks a drug up by `_id` hex or by its `DRG-` label code.
    async fn find_by_reference(&self, reference: &str) -> ServiceResult<Drug>;
    async fn create(&self, request: CreateDrugRequest, actor: &Actor) -> ServiceResult<Drug>;
    async fn update(&self, id: &str, request: UpdateDrugRequest) -> ServiceResult<Drug>;
    async fn delete(&self, id: &str) -> ServiceResult<()>;
    async fn scan(&self, request: ScanDrugRequest) -> ServiceResult<ScanDrugResponse>;
    async fn regenerate_qr(&self, id: &str) -> ServiceResult<Drug>;
    /// Atomically adds `delta` to the stock. `Ok(None)` means a deduction
    /// would have gone below zero and nothing changed.
    async fn adjust_stock(&self, id: ObjectId, delta: i64) -> ServiceResult<Option<Drug>>;
}

pub struct DrugServiceImpl {
    pub drug_repo: Arc<dyn DrugRepository>,
    pub alert_service: Arc<dyn AlertService>,
    pub hub: Arc<NotificationHub>,
}

fn validate_dates(manufactured: NaiveDate, expires: NaiveDate) -> ServiceResult<()> {
    if expires <= manufactured {
        return Err(ServiceError::InvalidInput(
            "expiryDate must be after manufactureDate".to_string(),
        ));
    }
    Ok(())
}

fn validate_thresholds(min: i64, max: i64) -> ServiceResult<()> {
    if max < min {
        return Err(ServiceError::InvalidInput(
            "maxThreshold must not be below minThreshold".to_string(),
        ));
    }
    Ok(())
}

fn render_qr(drug: &Drug) -> ServiceResult<String> {
    qr::drug_qr(drug).map_err(|e| {
        error!("QR generation failed: {}", e);
        ServiceError::InternalError(e.to_string())
    })
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl DrugServiceImpl {
    pub fn new(
        drug_repo: Arc<dyn DrugRepository>,
        alert_service: Arc<dyn AlertService>,
        hub: Arc<NotificationHub>,
    ) -> Self {
        Self { drug_repo, alert_service, hub }
    }

    fn publish_stock(&self, drug: &Drug) {
        self.hub.broadcast(STOCK_UPDATE, &StockUpdate::from(drug));
    }

    /// Alert bookkeeping never fails the request that triggered it.
    async fn review_alerts(&self, drug: &Drug, expiry_changed: bool) {
        if let Err(e) = self.alert_service.check_stock(drug).await {
            error!(drug = ?drug.id, "Stock alert check failed: {}", e);
        }
        if expiry_changed {
            if let Err(e) = self.alert_service.check_expiry(drug, Utc::now().date_naive()).await {
                error!(drug = ?drug.id, "Expiry alert check failed: {}", e);
            }
        }
    }

    async fn ensure_batch_free(&self, batch_no: &str, except: Option<ObjectId>) -> ServiceResult<()> {
        if let Some(existing) = self.drug_repo.find_by_batch(batch_no).await? {
            if except.is_none() || existing.id != except {
                warn!(batch_no, "Batch number already registered");
                return Err(ServiceError::Conflict(format!("Batch {} already exists", batch_no)));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DrugService for DrugServiceImpl {
    #[instrument(skip(self))]
    async fn list(&self, filter: DrugFilter, page: Page) -> ServiceResult<DrugListResponse> {
        let (drugs, total) = self.drug_repo.list(&filter, page).await?;
        Ok(DrugListResponse {
            success: true,
            drugs: DrugResponse::from_drugs(drugs, Utc::now().date_naive()),
            total,
            page: page.page,
            pages: page.pages(total),
        })
    }

    #[instrument(skip(self))]
    async fn stats(&self) -> ServiceResult<InventoryStats> {
        let drugs = self.drug_repo.all(&DrugFilter::default()).await?;
        Ok(inventory_stats(&drugs, Utc::now().date_naive()))
    }

    async fn get(&self, id: &str) -> ServiceResult<Drug> {
        let id = parse_object_id(id, "drug")?;
        Ok(self.drug_repo.get_by_id(id).await?)
    }

    async fn find_by_reference(&self, reference: &str) -> ServiceResult<Drug> {
        let reference = reference.trim();
        if let Ok(id) = ObjectId::parse_str(reference) {
            return Ok(self.drug_repo.get_by_id(id).await?);
        }
        self.drug_repo
            .find_by_drug_id(reference)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Drug {} not found", reference)))
    }

    #[instrument(skip(self, request, actor), fields(batch_no = %request.batch_no))]
    async fn create(&self, request: CreateDrugRequest, actor: &Actor) -> ServiceResult<Drug> {
        validate_dates(request.manufacture_date, request.expiry_date)?;
        let min_threshold = request.min_threshold.unwrap_or(DEFAULT_MIN_THRESHOLD);
        let max_threshold = request.max_threshold.unwrap_or(DEFAULT_MAX_THRESHOLD);
        validate_thresholds(min_threshold, max_threshold)?;

        let batch_no = request.batch_no.trim().to_string();
        self.ensure_batch_free(&batch_no, None).await?;

        let mut drug = Drug {
            id: None,
            drug_id: drug_code(),
            name: request.name.trim().to_string(),
            generic_name: trimmed(request.generic_name),
            category: request.category.unwrap_or_default(),
            batch_no,
            quantity: request.quantity,
            unit: request.unit.unwrap_or_default(),
            price: request.price,
            manufacturer: request.manufacturer.trim().to_string(),
            supplier: request.supplier.trim().to_string(),
            manufacture_date: request.manufacture_date,
            expiry_date: request.expiry_date,
            location: request.location.unwrap_or_default(),
            min_threshold,
            max_threshold,
            storage_condition: request.storage_condition.unwrap_or_default(),
            description: trimmed(request.description),
            image_url: request.image_url,
            qr_code: None,
            stock_status: StockStatus::InStock,
            created_by: Some(actor.id),
            created_at: None,
            updated_at: None,
        };
        drug.refresh_stock_status();
        drug.qr_code = Some(render_qr(&drug)?);

        let created = self.drug_repo.create(drug).await?;
        info!(drug_id = %created.drug_id, status = created.stock_status.as_str(), "Drug created");
        self.publish_stock(&created);
        self.review_alerts(&created, true).await;
        Ok(created)
    }

    #[instrument(skip(self, request))]
    async fn update(&self, id: &str, request: UpdateDrugRequest) -> ServiceResult<Drug> {
        let id = parse_object_id(id, "drug")?;
        let mut drug = self.drug_repo.get_by_id(id).await?;
        let previous_quantity = drug.quantity;
        let previous_status = drug.stock_status;
        let previous_expiry = drug.expiry_date;
        let quantity_edit = if request.quantity.is_some() { QuantityEdit::Replace } else { QuantityEdit::Keep };
        let mut label_changed = false;

        if let Some(name) = request.name {
            label_changed |= name.trim() != drug.name;
            drug.name = name.trim().to_string();
        }
        if let Some(batch_no) = request.batch_no {
            let batch_no = batch_no.trim().to_string();
            if batch_no != drug.batch_no {
                self.ensure_batch_free(&batch_no, Some(id)).await?;
                drug.batch_no = batch_no;
                label_changed = true;
            }
        }
        if request.generic_name.is_some() {
            drug.generic_name = trimmed(request.generic_name);
        }
        if let Some(category) = request.category {
            drug.category = category;
        }
        if let Some(quantity) = request.quantity {
            drug.quantity = quantity;
        }
        if let Some(unit) = request.unit {
            drug.unit = unit;
        }
        if let Some(price) = request.price {
            drug.price = price;
        }
        if let Some(manufacturer) = request.manufacturer {
            drug.manufacturer = manufacturer.trim().to_string();
        }
        if let Some(supplier) = request.supplier {
            drug.supplier = supplier.trim().to_string();
        }
        if let Some(date) = request.manufacture_date {
            drug.manufacture_date = date;
        }
        if let Some(date) = request.expiry_date {
            drug.expiry_date = date;
        }
        if let Some(location) = request.location {
            drug.location = location;
        }
        if let Some(min) = request.min_threshold {
            drug.min_threshold = min;
        }
        if let Some(max) = request.max_threshold {
            drug.max_threshold = max;
        }
        if let Some(storage) = request.storage_condition {
            drug.storage_condition = storage;
        }
        if request.description.is_some() {
            drug.description = trimmed(request.description);
        }
        if request.image_url.is_some() {
            drug.image_url = request.image_url;
        }

        validate_dates(drug.manufacture_date, drug.expiry_date)?;
        validate_thresholds(drug.min_threshold, drug.max_threshold)?;
        let expiry_changed = drug.expiry_date != previous_expiry;
        drug.refresh_stock_status();
        if label_changed || expiry_changed || drug.qr_code.is_none() {
            drug.qr_code = Some(render_qr(&drug)?);
        }

        let updated = self.drug_repo.update(id, drug, quantity_edit).await?;
        info!(drug_id = %updated.drug_id, "Drug updated");
        let restocked = quantity_edit == QuantityEdit::Replace && updated.quantity != previous_quantity;
        if restocked || updated.stock_status != previous_status {
            self.publish_stock(&updated);
        }
        self.review_alerts(&updated, expiry_changed).await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> ServiceResult<()> {
        let id = parse_object_id(id, "drug")?;
        self.drug_repo.delete(id).await?;
        info!(drug = %id, "Drug deleted");
        Ok(())
    }

    #[instrument(skip(self, request), fields(reference = %request.drug_id))]
    async fn scan(&self, request: ScanDrugRequest) -> ServiceResult<ScanDrugResponse> {
        let drug = self.find_by_reference(&request.drug_id).await?;
        if let Some(batch_no) = request.batch_no.as_deref().map(str::trim) {
            if batch_no != drug.batch_no {
                warn!(expected = %drug.batch_no, scanned = batch_no, "Batch mismatch on scan");
                return Err(ServiceError::InvalidInput("Batch number does not match".to_string()));
            }
        }
        let today = Utc::now().date_naive();
        let expired = drug.is_expired(today);
        let message = if expired {
            "Drug verified, but this batch has expired"
        } else {
            "Drug verified successfully"
        };
        info!(drug_id = %drug.drug_id, expired, "Drug scanned");
        Ok(ScanDrugResponse {
            success: true,
            drug: DrugResponse::from_drug(drug, today),
            verified: true,
            expired,
            message: message.to_string(),
        })
    }

    #[instrument(skip(self))]
    async fn regenerate_qr(&self, id: &str) -> ServiceResult<Drug> {
        let id = parse_object_id(id, "drug")?;
        let mut drug = self.drug_repo.get_by_id(id).await?;
        drug.qr_code = Some(render_qr(&drug)?);
        Ok(self.drug_repo.update(id, drug, QuantityEdit::Keep).await?)
    }

    #[instrument(skip(self))]
    async fn adjust_stock(&self, id: ObjectId, delta: i64) -> ServiceResult<Option<Drug>> {
        let Some(drug) = self.drug_repo.adjust_quantity(id, delta).await? else {
            warn!(drug = %id, delta, "Stock adjustment refused");
            return Ok(None);
        };
        info!(drug = %id, delta, quantity = drug.quantity, "Stock adjusted");
        self.publish_stock(&drug);
        self.review_alerts(&drug, false).await;
        Ok(Some(drug))
    }
}
