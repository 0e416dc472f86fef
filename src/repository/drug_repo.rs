use crate::model::drug::Drug;
use crate::repository::filters::{timestamp_key, DrugFilter, Page};
use crate::repository::mongo::DRUGS;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use futures::stream::TryStreamExt;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::Database;
use tracing::{error, info, warn};

/// Whether an edit writes its own quantity or leaves the stored one alone.
/// Stock otherwise only moves through `adjust_quantity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityEdit {
    Keep,
    Replace,
}

#[async_trait]
pub trait DrugRepository: Send + Sync {
    async fn create(&self, drug: Drug) -> RepositoryResult<Drug>;
    async fn get_by_id(&self, id: ObjectId) -> RepositoryResult<Drug>;
    async fn find_by_drug_id(&self, drug_id: &str) -> RepositoryResult<Option<Drug>>;
    async fn find_by_batch(&self, batch_no: &str) -> RepositoryResult<Option<Drug>>;
    /// Writes the editable fields of `drug` and re-derives `stockStatus` from
    /// the stored quantity, returning the document as stored.
    async fn update(&self, id: ObjectId, drug: Drug, quantity: QuantityEdit) -> RepositoryResult<Drug>;
    async fn delete(&self, id: ObjectId) -> RepositoryResult<()>;
    /// One page of matching drugs, newest first, with the total match count.
    async fn list(&self, filter: &DrugFilter, page: Page) -> RepositoryResult<(Vec<Drug>, u64)>;
    async fn all(&self, filter: &DrugFilter) -> RepositoryResult<Vec<Drug>>;
    /// Adds `delta` to the quantity and recomputes the stock status in one
    /// atomic update. Returns `None` when the drug is missing or the result
    /// would go below zero.
    async fn adjust_quantity(&self, id: ObjectId, delta: i64) -> RepositoryResult<Option<Drug>>;
}

pub struct MongoDrugRepository {
    collection: mongodb::Collection<Drug>,
}

impl MongoDrugRepository {
    pub fn new(db: &Database) -> Self {
        MongoDrugRepository {
            collection: db.collection::<Drug>(DRUGS),
        }
    }
}

fn stock_status_stage() -> Document {
    doc! { "$set": { "stockStatus": { "$switch": {
        "branches": [
            { "case": { "$lte": ["$quantity", 0] }, "then": "out-of-stock" },
            { "case": { "$lte": ["$quantity", "$minThreshold"] }, "then": "low-stock" },
        ],
        "default": "in-stock",
    } } } }
}

/// Aggregation pipeline applying a quantity delta and re-deriving `stockStatus`
/// from the new quantity, so both fields move together.
pub fn quantity_adjustment_pipeline(delta: i64, updated_at: &str) -> Vec<Document> {
    vec![
        doc! { "$set": { "quantity": { "$add": ["$quantity", delta] }, "updatedAt": updated_at } },
        stock_status_stage(),
    ]
}

/// Pipeline writing an edited drug. Values go through `$literal` so user text
/// starting with `$` is never read as a field path. Identity, creation stamps
/// and the derived status are never written from the edit.
pub fn drug_edit_pipeline(drug: &Drug, quantity: QuantityEdit) -> RepositoryResult<Vec<Document>> {
    let mut fields = bson::to_document(drug)?;
    for key in ["_id", "drugId", "createdAt", "createdBy", "stockStatus"] {
        fields.remove(key);
    }
    if quantity == QuantityEdit::Keep {
        fields.remove("quantity");
    }
    let literals: Document = fields
        .into_iter()
        .map(|(key, value)| (key, Bson::Document(doc! { "$literal": value })))
        .collect();
    Ok(vec![doc! { "$set": literals }, stock_status_stage()])
}

#[async_trait]
impl DrugRepository for MongoDrugRepository {
    #[tracing::instrument(skip(self, drug), fields(batch_no = %drug.batch_no))]
    async fn create(&self, mut drug: Drug) -> RepositoryResult<Drug> {
        drug.id = Some(ObjectId::new());
        let now = chrono::Utc::now();
        drug.created_at = Some(now);
        drug.updated_at = Some(now);
        match self.collection.insert_one(drug.clone(), None).await {
            Ok(_) => {
                info!(drug_id = %drug.drug_id, "Drug created");
                Ok(drug)
            }
            Err(e) => {
                error!("Failed to create drug: {}", e);
                Err(RepositoryError::from(e))
            }
        }
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    async fn get_by_id(&self, id: ObjectId) -> RepositoryResult<Drug> {
        match self.collection.find_one(doc! { "_id": id }, None).await {
            Ok(Some(drug)) => Ok(drug),
            Ok(None) => {
                warn!("Drug not found for ID: {}", id);
                Err(RepositoryError::not_found(format!("Drug not found for ID: {}", id)))
            }
            Err(e) => {
                error!("Failed to fetch drug by ID: {}", e);
                Err(RepositoryError::database(format!("Failed to fetch drug by ID: {}", e)))
            }
        }
    }

    async fn find_by_drug_id(&self, drug_id: &str) -> RepositoryResult<Option<Drug>> {
        Ok(self.collection.find_one(doc! { "drugId": drug_id }, None).await?)
    }

    async fn find_by_batch(&self, batch_no: &str) -> RepositoryResult<Option<Drug>> {
        Ok(self.collection.find_one(doc! { "batchNo": batch_no }, None).await?)
    }

    #[tracing::instrument(skip(self, drug), fields(id = %id, quantity = ?quantity))]
    async fn update(&self, id: ObjectId, mut drug: Drug, quantity: QuantityEdit) -> RepositoryResult<Drug> {
        drug.updated_at = Some(chrono::Utc::now());
        let pipeline = drug_edit_pipeline(&drug, quantity)?;
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        match self.collection.find_one_and_update(doc! { "_id": id }, pipeline, options).await {
            Ok(Some(stored)) => {
                info!(status = stored.stock_status.as_str(), "Drug updated");
                Ok(stored)
            }
            Ok(None) => Err(RepositoryError::not_found(format!("No drug found to update for ID: {}", id))),
            Err(e) => {
                error!("Failed to update drug: {}", e);
                Err(RepositoryError::from(e))
            }
        }
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    async fn delete(&self, id: ObjectId) -> RepositoryResult<()> {
        match self.collection.delete_one(doc! { "_id": id }, None).await {
            Ok(result) if result.deleted_count > 0 => {
                info!("Drug deleted");
                Ok(())
            }
            Ok(_) => Err(RepositoryError::not_found(format!("No drug found to delete for ID: {}", id))),
            Err(e) => {
                error!("Failed to delete drug: {}", e);
                Err(RepositoryError::database(format!("Failed to delete drug: {}", e)))
            }
        }
    }

    #[tracing::instrument(skip(self, filter))]
    async fn list(&self, filter: &DrugFilter, page: Page) -> RepositoryResult<(Vec<Drug>, u64)> {
        let query = filter.to_document();
        let total = self.collection.count_documents(query.clone(), None).await?;
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .skip(page.skip())
            .limit(page.limit as i64)
            .build();
        let cursor = self.collection.find(query, options).await?;
        let drugs: Vec<Drug> = cursor.try_collect().await?;
        info!(total, returned = drugs.len(), page = page.page, "Listed drugs");
        Ok((drugs, total))
    }

    async fn all(&self, filter: &DrugFilter) -> RepositoryResult<Vec<Drug>> {
        let options = FindOptions::builder().sort(doc! { "expiryDate": 1 }).build();
        let cursor = self.collection.find(filter.to_document(), options).await?;
        Ok(cursor.try_collect().await?)
    }

    #[tracing::instrument(skip(self), fields(id = %id, delta = delta))]
    async fn adjust_quantity(&self, id: ObjectId, delta: i64) -> RepositoryResult<Option<Drug>> {
        let mut filter = doc! { "_id": id };
        if delta < 0 {
            filter.insert("quantity", doc! { "$gte": -delta });
        }
        let now = timestamp_key(&chrono::Utc::now());
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let updated = self
            .collection
            .find_one_and_update(filter, quantity_adjustment_pipeline(delta, &now), options)
            .await?;
        match &updated {
            Some(drug) => info!(quantity = drug.quantity, status = drug.stock_status.as_str(), "Stock adjusted"),
            None => warn!("Stock adjustment matched no drug"),
        }
        Ok(updated)
    }
}
