use crate::model::movement::{Movement, MovementStatus, TrackingEvent};
use crate::repository::filters::{MovementFilter, Page};
use crate::repository::mongo::MOVEMENTS;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::util::timestamp;
use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::Database;
use tracing::{error, info, warn};

/// Fields written together with a new tracking event. `None` leaves the
/// stored value as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovementChange {
    pub status: Option<MovementStatus>,
    pub driver: Option<ObjectId>,
    pub approved_by: Option<ObjectId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub stock_deducted: Option<bool>,
}

impl MovementChange {
    pub fn apply(&self, movement: &mut Movement) {
        if let Some(status) = self.status {
            movement.status = status;
        }
        if let Some(driver) = self.driver {
            movement.driver = Some(driver);
        }
        if let Some(approved_by) = self.approved_by {
            movement.approved_by = Some(approved_by);
        }
        if let Some(at) = self.approved_at {
            movement.approved_at = Some(at);
        }
        if let Some(at) = self.dispatched_at {
            movement.dispatched_at = Some(at);
        }
        if let Some(at) = self.delivered_at {
            movement.delivered_at = Some(at);
        }
        if let Some(deducted) = self.stock_deducted {
            movement.stock_deducted = deducted;
        }
    }

    /// `$set` of the changed fields plus a `$push` of `event` onto the
    /// tracking history, leaving every other stored field untouched.
    pub fn update_document(&self, event: &TrackingEvent, updated_at: DateTime<Utc>) -> RepositoryResult<Document> {
        let mut set = doc! { "updatedAt": timestamp::format(&updated_at) };
        if let Some(status) = self.status {
            set.insert("status", status.as_str());
        }
        if let Some(driver) = self.driver {
            set.insert("driver", driver);
        }
        if let Some(approved_by) = self.approved_by {
            set.insert("approvedBy", approved_by);
        }
        for (field, at) in [
            ("approvedAt", self.approved_at),
            ("dispatchedAt", self.dispatched_at),
            ("deliveredAt", self.delivered_at),
        ] {
            if let Some(at) = at {
                set.insert(field, timestamp::format(&at));
            }
        }
        if let Some(deducted) = self.stock_deducted {
            set.insert("stockDeducted", deducted);
        }
        let event = bson::to_bson(event)
            .map_err(|e| RepositoryError::serialization(format!("Failed to serialize tracking event: {}", e)))?;
        Ok(doc! { "$set": set, "$push": { "tracking": event } })
    }
}

#[async_trait]
pub trait MovementRepository: Send + Sync {
    async fn create(&self, movement: Movement) -> RepositoryResult<Movement>;
    async fn get_by_id(&self, id: ObjectId) -> RepositoryResult<Movement>;
    async fn find_by_movement_id(&self, movement_id: &str) -> RepositoryResult<Option<Movement>>;
    /// Appends `event` and applies `change` only if the stored status still
    /// equals `expected`. Fails with `Conflict` when another writer moved it first.
    async fn record_event(
        &self,
        id: ObjectId,
        expected: MovementStatus,
        change: MovementChange,
        event: TrackingEvent,
    ) -> RepositoryResult<Movement>;
    async fn list(&self, filter: &MovementFilter, page: Page) -> RepositoryResult<(Vec<Movement>, u64)>;
    async fn all(&self, filter: &MovementFilter) -> RepositoryResult<Vec<Movement>>;
}

pub struct MongoMovementRepository {
    collection: mongodb::Collection<Movement>,
}

impl MongoMovementRepository {
    pub fn new(db: &Database) -> Self {
        MongoMovementRepository {
            collection: db.collection::<Movement>(MOVEMENTS),
        }
    }
}

#[async_trait]
impl MovementRepository for MongoMovementRepository {
    #[tracing::instrument(skip(self, movement), fields(movement_id = %movement.movement_id))]
    async fn create(&self, mut movement: Movement) -> RepositoryResult<Movement> {
        movement.id = Some(ObjectId::new());
        let now = Utc::now();
        movement.created_at = Some(now);
        movement.updated_at = Some(now);
        match self.collection.insert_one(movement.clone(), None).await {
            Ok(_) => {
                info!("Movement created");
                Ok(movement)
            }
            Err(e) => {
                error!("Failed to create movement: {}", e);
                Err(RepositoryError::from(e))
            }
        }
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    async fn get_by_id(&self, id: ObjectId) -> RepositoryResult<Movement> {
        match self.collection.find_one(doc! { "_id": id }, None).await {
            Ok(Some(movement)) => Ok(movement),
            Ok(None) => {
                warn!("Movement not found for ID: {}", id);
                Err(RepositoryError::not_found(format!("Movement not found for ID: {}", id)))
            }
            Err(e) => {
                error!("Failed to fetch movement by ID: {}", e);
                Err(RepositoryError::database(format!("Failed to fetch movement by ID: {}", e)))
            }
        }
    }

    async fn find_by_movement_id(&self, movement_id: &str) -> RepositoryResult<Option<Movement>> {
        Ok(self.collection.find_one(doc! { "movementId": movement_id }, None).await?)
    }

    #[tracing::instrument(skip(self, change, event), fields(id = %id, expected = %expected, next = ?change.status))]
    async fn record_event(
        &self,
        id: ObjectId,
        expected: MovementStatus,
        change: MovementChange,
        event: TrackingEvent,
    ) -> RepositoryResult<Movement> {
        let update = change.update_document(&event, Utc::now())?;
        let filter = doc! { "_id": id, "status": expected.as_str() };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        match self.collection.find_one_and_update(filter, update, options).await {
            Ok(Some(movement)) => {
                info!("Movement event recorded");
                Ok(movement)
            }
            Ok(None) => {
                warn!("Movement changed concurrently");
                Err(RepositoryError::conflict(format!(
                    "Movement {} is no longer {}",
                    id, expected
                )))
            }
            Err(e) => {
                error!("Failed to record movement event: {}", e);
                Err(RepositoryError::from(e))
            }
        }
    }

    #[tracing::instrument(skip(self, filter))]
    async fn list(&self, filter: &MovementFilter, page: Page) -> RepositoryResult<(Vec<Movement>, u64)> {
        let query = filter.to_document();
        let total = self.collection.count_documents(query.clone(), None).await?;
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .skip(page.skip())
            .limit(page.limit as i64)
            .build();
        let cursor = self.collection.find(query, options).await?;
        let movements: Vec<Movement> = cursor.try_collect().await?;
        info!(total, returned = movements.len(), page = page.page, "Listed movements");
        Ok((movements, total))
    }

    async fn all(&self, filter: &MovementFilter) -> RepositoryResult<Vec<Movement>> {
        let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();
        let cursor = self.collection.find(filter.to_document(), options).await?;
        Ok(cursor.try_collect().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(status: MovementStatus) -> TrackingEvent {
        TrackingEvent {
            status,
            location: Some("Highway 4 checkpoint".into()),
            notes: None,
            updated_by: Some(ObjectId::new()),
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_checkpoint_update_only_pushes_tracking() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 1).unwrap();
        let update = MovementChange::default().update_document(&event(MovementStatus::InTransit), at).unwrap();
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.keys().collect::<Vec<_>>(), vec!["updatedAt"]);
        assert_eq!(set.get_str("updatedAt").unwrap(), "2025-03-01T08:00:01.000Z");
        let pushed = update.get_document("$push").unwrap().get_document("tracking").unwrap();
        assert_eq!(pushed.get_str("status").unwrap(), "in_transit");
        assert_eq!(pushed.get_str("timestamp").unwrap(), "2025-03-01T08:00:00.000Z");
    }

    #[test]
    fn test_transition_update_sets_named_fields() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 1).unwrap();
        let approver = ObjectId::new();
        let change = MovementChange {
            status: Some(MovementStatus::Approved),
            approved_by: Some(approver),
            approved_at: Some(at),
            stock_deducted: Some(true),
            ..Default::default()
        };
        let update = change.update_document(&event(MovementStatus::Approved), at).unwrap();
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("status").unwrap(), "approved");
        assert_eq!(set.get_object_id("approvedBy").unwrap(), approver);
        assert!(set.get_bool("stockDeducted").unwrap());
        assert!(!set.contains_key("driver"));
        assert!(!set.contains_key("tracking"));
    }
}
