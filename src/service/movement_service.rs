//! Movement workflow: request, approval with stock deduction, dispatch,
//! checkpoint scans and delivery.
//!
//! Stock is moved with per-document atomic updates. Approval deducts first
//! and then compare-and-sets the status; if the status write loses a race
//! the deduction is put back. Cancellation does the reverse. Every write after
//! creation appends one tracking event and sets only the fields it changes.

use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::Utc;
use tracing::{error, info, instrument, warn};

use crate::dto::movement_dto::{
    AssignDriverRequest, CreateMovementRequest, MovementListResponse, MovementResponse, MovementStats,
    MovementStatusChanged, ScanMovementRequest, UpdateStatusRequest,
};
use crate::model::alert::{Alert, AlertType, Severity};
use crate::model::drug::Location;
use crate::model::movement::{Movement, MovementStatus, TrackingEvent};
use crate::model::user::{Actor, Role};
use crate::repository::filters::{MovementFilter, Page};
use crate::repository::movement_repo::{MovementChange, MovementRepository};
use crate::repository::user_repo::UserRepository;
use crate::service::alert_service::AlertService;
use crate::service::drug_service::DrugService;
use crate::service::notification_hub::{NotificationHub, MOVEMENT_STATUS_CHANGED, MOVEMENT_UPDATED};
use crate::service::report_service::movement_stats;
use crate::util::error::{ServiceError, ServiceResult};
use crate::util::ids::{movement_code, parse_object_id};
use crate::util::qr;

/// Whether `actor` may move `movement` to `next`.
pub fn may_transition(actor: &Actor, movement: &Movement, next: MovementStatus) -> bool {
    if actor.has_role(&Role::LOGISTICS) {
        return true;
    }
    match next {
        MovementStatus::InTransit | MovementStatus::Delivered => {
            actor.role == Role::Driver && movement.is_assigned_to(&actor.id)
        }
        MovementStatus::Cancelled => movement.requested_by == actor.id,
        _ => false,
    }
}

/// What a scan at `location` does to a movement in its current state.
pub fn scan_outcome(movement: &Movement, location: &str) -> ServiceResult<Option<MovementStatus>> {
    match movement.status {
        MovementStatus::Pending => Ok(None),
        MovementStatus::Approved => Ok(Some(MovementStatus::InTransit)),
        MovementStatus::InTransit => match location.parse::<Location>() {
            Ok(at) if at == movement.to => Ok(Some(MovementStatus::Delivered)),
            _ => Ok(None),
        },
        terminal => Err(ServiceError::InvalidInput(format!("Movement is already {}", terminal))),
    }
}

#[async_trait]
pub trait MovementService: Send + Sync {
    async fn list(&self, actor: &Actor, filter: MovementFilter, page: Page) -> ServiceResult<MovementListResponse>;
    async fn stats(&self, actor: &Actor) -> ServiceResult<MovementStats>;
    /// `reference` is the `_id` hex or the `MOV-` slip code.
    async fn get(&self, actor: &Actor, reference: &str) -> ServiceResult<Movement>;
    async fn create(&self, actor: &Actor, request: CreateMovementRequest) -> ServiceResult<Movement>;
    async fn update_status(&self, actor: &Actor, reference: &str, request: UpdateStatusRequest)
        -> ServiceResult<Movement>;
    async fn scan(&self, actor: &Actor, reference: &str, request: ScanMovementRequest) -> ServiceResult<Movement>;
    async fn assign_driver(&self, actor: &Actor, reference: &str, request: AssignDriverRequest)
        -> ServiceResult<Movement>;
}

pub struct MovementServiceImpl {
    pub movement_repo: Arc<dyn MovementRepository>,
    pub user_repo: Arc<dyn UserRepository>,
    pub drug_service: Arc<dyn DrugService>,
    pub alert_service: Arc<dyn AlertService>,
    pub hub: Arc<NotificationHub>,
}

impl MovementServiceImpl {
    pub fn new(
        movement_repo: Arc<dyn MovementRepository>,
        user_repo: Arc<dyn UserRepository>,
        drug_service: Arc<dyn DrugService>,
        alert_service: Arc<dyn AlertService>,
        hub: Arc<NotificationHub>,
    ) -> Self {
        Self { movement_repo, user_repo, drug_service, alert_service, hub }
    }

    async fn find(&self, reference: &str) -> ServiceResult<Movement> {
        let reference = reference.trim();
        if let Ok(id) = ObjectId::parse_str(reference) {
            return Ok(self.movement_repo.get_by_id(id).await?);
        }
        self.movement_repo
            .find_by_movement_id(reference)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Movement {} not found", reference)))
    }

    fn ensure_visible(actor: &Actor, movement: &Movement) -> ServiceResult<()> {
        if actor.role == Role::Driver && !movement.is_assigned_to(&actor.id) {
            return Err(ServiceError::Forbidden("Movement is not assigned to you".to_string()));
        }
        Ok(())
    }

    fn scope(actor: &Actor, mut filter: MovementFilter) -> MovementFilter {
        if actor.role == Role::Driver {
            filter.driver = Some(actor.id);
        }
        filter
    }

    async fn active_driver(&self, raw: &str) -> ServiceResult<ObjectId> {
        let id = parse_object_id(raw, "driver")?;
        let user = self
            .user_repo
            .find_by_id(&id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Driver not found".to_string()))?;
        if user.role != Role::Driver || !user.is_active {
            return Err(ServiceError::InvalidInput("User is not an active driver".to_string()));
        }
        Ok(id)
    }

    fn publish_updated(&self, movement: &Movement) {
        self.hub.broadcast(MOVEMENT_UPDATED, &MovementResponse::from(movement.clone()));
    }

    fn publish_status(&self, movement: &Movement) {
        let changed = MovementStatusChanged {
            movement_id: movement.id.map(|id| id.to_hex()).unwrap_or_default(),
            status: movement.status,
        };
        self.hub.broadcast(MOVEMENT_STATUS_CHANGED, &changed);
        self.publish_updated(movement);
    }

    async fn raise_movement_alert(&self, movement: &Movement, severity: Severity, title: &str, message: String) {
        let alert = Alert::new(AlertType::Movement, severity, title, message)
            .for_drug(Some(movement.drug))
            .for_movement(movement.id);
        if let Err(e) = self.alert_service.raise(alert).await {
            error!(movement = %movement.movement_id, "Failed to raise movement alert: {}", e);
        }
    }

    async fn restore_stock(&self, drug: ObjectId, quantity: i64, movement_code: &str) {
        match self.drug_service.adjust_stock(drug, quantity).await {
            Ok(Some(_)) => info!(movement = movement_code, "Stock restored"),
            Ok(None) => error!(movement = movement_code, "Stock restore refused"),
            Err(e) => error!(movement = movement_code, "Stock restore failed: {}", e),
        }
    }

    /// Applies a validated transition and persists it against the status it was read with.
    async fn transition(
        &self,
        actor: &Actor,
        movement: Movement,
        next: MovementStatus,
        location: Option<String>,
        notes: Option<String>,
    ) -> ServiceResult<Movement> {
        let id = movement
            .id
            .ok_or_else(|| ServiceError::InternalError("Movement has no id".to_string()))?;
        let previous = movement.status;
        let (drug, quantity, code) = (movement.drug, movement.quantity, movement.movement_id.clone());
        let now = Utc::now();
        let mut deducted_now = false;
        let mut release_stock = false;
        let mut change = MovementChange { status: Some(next), ..Default::default() };

        match next {
            MovementStatus::Approved => {
                if self.drug_service.adjust_stock(drug, -quantity).await?.is_none() {
                    self.drug_service.get(&drug.to_hex()).await?;
                    warn!(movement = %code, "Approval refused, insufficient stock");
                    return Err(ServiceError::Conflict("Insufficient stock to approve this movement".to_string()));
                }
                deducted_now = true;
                change.stock_deducted = Some(true);
                change.approved_by = Some(actor.id);
                change.approved_at = Some(now);
            }
            MovementStatus::Rejected => change.approved_by = Some(actor.id),
            MovementStatus::InTransit => change.dispatched_at = Some(now),
            MovementStatus::Delivered => change.delivered_at = Some(now),
            MovementStatus::Cancelled => {
                release_stock = movement.stock_deducted;
                change.stock_deducted = Some(false);
            }
            MovementStatus::Pending => {}
        }

        let event = TrackingEvent {
            status: next,
            location,
            notes,
            updated_by: Some(actor.id),
            timestamp: now,
        };
        let saved = match self.movement_repo.record_event(id, previous, change, event).await {
            Ok(saved) => saved,
            Err(e) => {
                warn!(movement = %id, "Status write lost: {}", e);
                if deducted_now {
                    self.restore_stock(drug, quantity, &code).await;
                }
                return Err(e.into());
            }
        };

        if release_stock {
            self.restore_stock(drug, quantity, &code).await;
        }
        info!(movement = %saved.movement_id, from = %previous, to = %next, "Movement status changed");

        if next == MovementStatus::Rejected {
            self.raise_movement_alert(
                &saved,
                Severity::Warning,
                "Movement rejected",
                format!("Movement {} of {} was rejected", saved.movement_id, saved.drug_name),
            )
            .await;
        }
        self.publish_status(&saved);
        Ok(saved)
    }
}

#[async_trait]
impl MovementService for MovementServiceImpl {
    #[instrument(skip(self, actor), fields(user = %actor.id))]
    async fn list(&self, actor: &Actor, filter: MovementFilter, page: Page) -> ServiceResult<MovementListResponse> {
        let filter = Self::scope(actor, filter);
        let (movements, total) = self.movement_repo.list(&filter, page).await?;
        Ok(MovementListResponse {
            success: true,
            movements: movements.into_iter().map(MovementResponse::from).collect(),
            total,
            page: page.page,
            pages: page.pages(total),
        })
    }

    #[instrument(skip(self, actor), fields(user = %actor.id))]
    async fn stats(&self, actor: &Actor) -> ServiceResult<MovementStats> {
        let movements = self.movement_repo.all(&Self::scope(actor, MovementFilter::default())).await?;
        Ok(movement_stats(&movements))
    }

    async fn get(&self, actor: &Actor, reference: &str) -> ServiceResult<Movement> {
        let movement = self.find(reference).await?;
        Self::ensure_visible(actor, &movement)?;
        Ok(movement)
    }

    #[instrument(skip(self, actor, request), fields(user = %actor.id, drug = %request.drug_id))]
    async fn create(&self, actor: &Actor, request: CreateMovementRequest) -> ServiceResult<Movement> {
        let drug = self.drug_service.find_by_reference(&request.drug_id).await?;
        let drug_id = drug
            .id
            .ok_or_else(|| ServiceError::InternalError("Drug has no id".to_string()))?;
        if request.from != drug.location {
            return Err(ServiceError::InvalidInput(format!(
                "{} is stocked at {}, not {}",
                drug.name, drug.location, request.from
            )));
        }
        if request.from == request.to {
            return Err(ServiceError::InvalidInput("Source and destination must differ".to_string()));
        }
        if request.quantity <= 0 {
            return Err(ServiceError::InvalidInput("Quantity must be positive".to_string()));
        }
        if request.quantity > drug.quantity {
            return Err(ServiceError::InvalidInput(format!(
                "Insufficient stock: {} available, {} requested",
                drug.quantity, request.quantity
            )));
        }
        let driver = match request.driver.as_deref() {
            Some(raw) => Some(self.active_driver(raw).await?),
            None => None,
        };

        let now = Utc::now();
        let mut movement = Movement {
            id: None,
            movement_id: movement_code(),
            drug: drug_id,
            drug_name: drug.name,
            batch_no: drug.batch_no,
            quantity: request.quantity,
            from: request.from,
            to: request.to,
            priority: request.priority.unwrap_or_default(),
            status: MovementStatus::Pending,
            driver,
            requested_by: actor.id,
            approved_by: None,
            expected_delivery: request.expected_delivery,
            notes: request.notes.clone(),
            tracking: vec![TrackingEvent {
                status: MovementStatus::Pending,
                location: Some(request.from.to_string()),
                notes: request.notes.or_else(|| Some("Movement requested".to_string())),
                updated_by: Some(actor.id),
                timestamp: now,
            }],
            stock_deducted: false,
            qr_code: None,
            approved_at: None,
            dispatched_at: None,
            delivered_at: None,
            created_at: None,
            updated_at: None,
        };
        movement.qr_code = Some(qr::movement_qr(&movement).map_err(|e| {
            error!("QR generation failed: {}", e);
            ServiceError::InternalError(e.to_string())
        })?);

        let created = self.movement_repo.create(movement).await?;
        info!(movement = %created.movement_id, quantity = created.quantity, "Movement requested");
        self.raise_movement_alert(
            &created,
            Severity::Info,
            "New movement request",
            format!(
                "{} x{} requested from {} to {}",
                created.drug_name, created.quantity, created.from, created.to
            ),
        )
        .await;
        self.publish_updated(&created);
        if let Some(driver) = created.driver {
            self.hub.to_user(&driver.to_hex(), MOVEMENT_UPDATED, &MovementResponse::from(created.clone()));
        }
        Ok(created)
    }

    #[instrument(skip(self, actor, request), fields(user = %actor.id, status = %request.status))]
    async fn update_status(
        &self,
        actor: &Actor,
        reference: &str,
        request: UpdateStatusRequest,
    ) -> ServiceResult<Movement> {
        let movement = self.find(reference).await?;
        Self::ensure_visible(actor, &movement)?;
        let next = request.status;
        if movement.status.is_terminal() {
            return Err(ServiceError::InvalidInput(format!("Movement is already {}", movement.status)));
        }
        if !movement.status.can_transition_to(next) {
            return Err(ServiceError::InvalidInput(format!(
                "Cannot change status from {} to {}",
                movement.status, next
            )));
        }
        if !may_transition(actor, &movement, next) {
            warn!(role = %actor.role, "Status change not permitted");
            return Err(ServiceError::Forbidden(format!("Your role cannot set status {}", next)));
        }
        self.transition(actor, movement, next, request.location, request.notes).await
    }

    #[instrument(skip(self, actor, request), fields(user = %actor.id, location = %request.location))]
    async fn scan(&self, actor: &Actor, reference: &str, request: ScanMovementRequest) -> ServiceResult<Movement> {
        let movement = self.find(reference).await?;
        Self::ensure_visible(actor, &movement)?;
        let location = request.location.trim().to_string();

        if let Some(next) = scan_outcome(&movement, &location)? {
            return self.transition(actor, movement, next, Some(location), request.notes).await;
        }

        let id = movement
            .id
            .ok_or_else(|| ServiceError::InternalError("Movement has no id".to_string()))?;
        let status = movement.status;
        let event = TrackingEvent {
            status,
            location: Some(location),
            notes: request.notes,
            updated_by: Some(actor.id),
            timestamp: Utc::now(),
        };
        let saved = self.movement_repo.record_event(id, status, MovementChange::default(), event).await?;
        info!(movement = %saved.movement_id, "Checkpoint recorded");
        self.publish_updated(&saved);
        Ok(saved)
    }

    #[instrument(skip(self, actor, request), fields(user = %actor.id, driver = %request.driver))]
    async fn assign_driver(
        &self,
        actor: &Actor,
        reference: &str,
        request: AssignDriverRequest,
    ) -> ServiceResult<Movement> {
        let movement = self.find(reference).await?;
        if movement.status.is_terminal() {
            return Err(ServiceError::InvalidInput(format!("Movement is already {}", movement.status)));
        }
        let driver = self.active_driver(&request.driver).await?;
        let id = movement
            .id
            .ok_or_else(|| ServiceError::InternalError("Movement has no id".to_string()))?;
        let status = movement.status;
        let change = MovementChange { driver: Some(driver), ..Default::default() };
        let event = TrackingEvent {
            status,
            location: None,
            notes: Some("Driver assigned".to_string()),
            updated_by: Some(actor.id),
            timestamp: Utc::now(),
        };
        let saved = self.movement_repo.record_event(id, status, change, event).await?;
        info!(movement = %saved.movement_id, driver = %driver, "Driver assigned");

        let payload = MovementResponse::from(saved.clone());
        self.hub.to_user(&driver.to_hex(), MOVEMENT_UPDATED, &payload);
        self.hub.to_role(Role::Admin, MOVEMENT_UPDATED, &payload);
        self.hub.to_role(Role::Warehouse, MOVEMENT_UPDATED, &payload);
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::movement::Priority;

    fn movement(status: MovementStatus, requested_by: ObjectId, driver: Option<ObjectId>) -> Movement {
        Movement {
            id: Some(ObjectId::new()),
            movement_id: "MOV-TEST0001".into(),
            drug: ObjectId::new(),
            drug_name: "Amoxicillin".into(),
            batch_no: "AMX-1".into(),
            quantity: 5,
            from: Location::CentralWarehouse,
            to: Location::CityHospital,
            priority: Priority::Normal,
            status,
            driver,
            requested_by,
            approved_by: None,
            expected_delivery: None,
            notes: None,
            tracking: Vec::new(),
            stock_deducted: false,
            qr_code: None,
            approved_at: None,
            dispatched_at: None,
            delivered_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_logistics_roles_may_do_everything() {
        let warehouse = Actor::new(ObjectId::new(), Role::Warehouse);
        let m = movement(MovementStatus::Pending, ObjectId::new(), None);
        for next in [MovementStatus::Approved, MovementStatus::Rejected, MovementStatus::Cancelled] {
            assert!(may_transition(&warehouse, &m, next));
        }
    }

    #[test]
    fn test_pharmacist_may_only_cancel_own_request() {
        let pharmacist = Actor::new(ObjectId::new(), Role::Pharmacist);
        let own = movement(MovementStatus::Pending, pharmacist.id, None);
        let other = movement(MovementStatus::Pending, ObjectId::new(), None);
        assert!(may_transition(&pharmacist, &own, MovementStatus::Cancelled));
        assert!(!may_transition(&pharmacist, &other, MovementStatus::Cancelled));
        assert!(!may_transition(&pharmacist, &own, MovementStatus::Approved));
    }

    #[test]
    fn test_assigned_driver_may_dispatch_and_deliver() {
        let driver = Actor::new(ObjectId::new(), Role::Driver);
        let assigned = movement(MovementStatus::Approved, ObjectId::new(), Some(driver.id));
        let unassigned = movement(MovementStatus::Approved, ObjectId::new(), None);
        assert!(may_transition(&driver, &assigned, MovementStatus::InTransit));
        assert!(may_transition(&driver, &assigned, MovementStatus::Delivered));
        assert!(!may_transition(&driver, &assigned, MovementStatus::Approved));
        assert!(!may_transition(&driver, &unassigned, MovementStatus::InTransit));
    }

    #[test]
    fn test_scan_outcomes() {
        let requester = ObjectId::new();
        let pending = movement(MovementStatus::Pending, requester, None);
        assert_eq!(scan_outcome(&pending, "central-warehouse").unwrap(), None);

        let approved = movement(MovementStatus::Approved, requester, None);
        assert_eq!(scan_outcome(&approved, "anywhere").unwrap(), Some(MovementStatus::InTransit));

        let in_transit = movement(MovementStatus::InTransit, requester, None);
        assert_eq!(scan_outcome(&in_transit, "Highway 4").unwrap(), None);
        assert_eq!(scan_outcome(&in_transit, "City Hospital").unwrap(), Some(MovementStatus::Delivered));

        let delivered = movement(MovementStatus::Delivered, requester, None);
        assert!(matches!(scan_outcome(&delivered, "city-hospital"), Err(ServiceError::InvalidInput(_))));
    }
}
