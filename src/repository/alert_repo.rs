use crate::model::alert::{Alert, AlertType};
use crate::repository::filters::{timestamp_key, AlertFilter, Page};
use crate::repository::mongo::ALERTS;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use futures::stream::TryStreamExt;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::Database;
use tracing::{error, info, warn};

#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn create(&self, alert: Alert) -> RepositoryResult<Alert>;
    async fn list(&self, filter: &AlertFilter, page: Page) -> RepositoryResult<(Vec<Alert>, u64)>;
    async fn count(&self, filter: &AlertFilter) -> RepositoryResult<u64>;
    async fn mark_read(&self, id: ObjectId) -> RepositoryResult<Alert>;
    /// Returns how many alerts flipped to read.
    async fn mark_all_read(&self) -> RepositoryResult<u64>;
    async fn resolve(&self, id: ObjectId, resolved_by: Option<ObjectId>) -> RepositoryResult<Alert>;
    /// The unresolved alert of `alert_type` raised for `drug`, if any.
    async fn find_open(&self, drug: ObjectId, alert_type: AlertType) -> RepositoryResult<Option<Alert>>;
    /// Resolves every open alert of the given types for `drug`.
    async fn resolve_open_for_drug(
        &self,
        drug: ObjectId,
        types: &[AlertType],
        resolved_by: Option<ObjectId>,
    ) -> RepositoryResult<u64>;
}

pub struct MongoAlertRepository {
    collection: mongodb::Collection<Alert>,
}

impl MongoAlertRepository {
    pub fn new(db: &Database) -> Self {
        MongoAlertRepository {
            collection: db.collection::<Alert>(ALERTS),
        }
    }
}

#[async_trait]
impl AlertRepository for MongoAlertRepository {
    #[tracing::instrument(skip(self, alert), fields(alert_type = alert.alert_type.as_str()))]
    async fn create(&self, mut alert: Alert) -> RepositoryResult<Alert> {
        alert.id = Some(ObjectId::new());
        alert.created_at = Some(chrono::Utc::now());
        match self.collection.insert_one(alert.clone(), None).await {
            Ok(_) => {
                info!(title = %alert.title, "Alert created");
                Ok(alert)
            }
            Err(e) => {
                error!("Failed to create alert: {}", e);
                Err(RepositoryError::from(e))
            }
        }
    }

    #[tracing::instrument(skip(self, filter))]
    async fn list(&self, filter: &AlertFilter, page: Page) -> RepositoryResult<(Vec<Alert>, u64)> {
        let query = filter.to_document();
        let total = self.collection.count_documents(query.clone(), None).await?;
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .skip(page.skip())
            .limit(page.limit as i64)
            .build();
        let cursor = self.collection.find(query, options).await?;
        let alerts: Vec<Alert> = cursor.try_collect().await?;
        Ok((alerts, total))
    }

    async fn count(&self, filter: &AlertFilter) -> RepositoryResult<u64> {
        Ok(self.collection.count_documents(filter.to_document(), None).await?)
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    async fn mark_read(&self, id: ObjectId) -> RepositoryResult<Alert> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.collection
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": { "isRead": true } }, options)
            .await?
            .ok_or_else(|| {
                warn!("Alert not found for ID: {}", id);
                RepositoryError::not_found(format!("Alert not found for ID: {}", id))
            })
    }

    #[tracing::instrument(skip(self))]
    async fn mark_all_read(&self) -> RepositoryResult<u64> {
        let result = self
            .collection
            .update_many(doc! { "isRead": false }, doc! { "$set": { "isRead": true } }, None)
            .await?;
        info!(modified = result.modified_count, "Marked all alerts as read");
        Ok(result.modified_count)
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    async fn resolve(&self, id: ObjectId, resolved_by: Option<ObjectId>) -> RepositoryResult<Alert> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let update = doc! { "$set": {
            "isResolved": true,
            "isRead": true,
            "resolvedBy": resolved_by,
            "resolvedAt": timestamp_key(&chrono::Utc::now()),
        } };
        self.collection
            .find_one_and_update(doc! { "_id": id }, update, options)
            .await?
            .ok_or_else(|| RepositoryError::not_found(format!("Alert not found for ID: {}", id)))
    }

    async fn find_open(&self, drug: ObjectId, alert_type: AlertType) -> RepositoryResult<Option<Alert>> {
        let filter = doc! { "drug": drug, "type": alert_type.as_str(), "isResolved": false };
        Ok(self.collection.find_one(filter, None).await?)
    }

    #[tracing::instrument(skip(self, types), fields(drug = %drug))]
    async fn resolve_open_for_drug(
        &self,
        drug: ObjectId,
        types: &[AlertType],
        resolved_by: Option<ObjectId>,
    ) -> RepositoryResult<u64> {
        let type_names: Vec<&str> = types.iter().map(AlertType::as_str).collect();
        let filter = doc! { "drug": drug, "type": { "$in": type_names }, "isResolved": false };
        let update = doc! { "$set": {
            "isResolved": true,
            "resolvedBy": resolved_by,
            "resolvedAt": timestamp_key(&chrono::Utc::now()),
        } };
        let result = self.collection.update_many(filter, update, None).await?;
        if result.modified_count > 0 {
            info!(resolved = result.modified_count, "Auto-resolved drug alerts");
        }
        Ok(result.modified_count)
    }
}
