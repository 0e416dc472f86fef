//! In-memory stores and request helpers shared by the HTTP tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use bson::oid::ObjectId;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use pharma_assure_backend::app::app::{build_router, AppServices, Repositories};
use pharma_assure_backend::config::{AlertConfig, JwtConfig, UploadConfig};
use pharma_assure_backend::model::alert::{Alert, AlertType};
use pharma_assure_backend::model::drug::{Drug, StockStatus};
use pharma_assure_backend::model::movement::{Movement, MovementStatus, TrackingEvent};
use pharma_assure_backend::model::user::{Role, User};
use pharma_assure_backend::repository::alert_repo::AlertRepository;
use pharma_assure_backend::repository::drug_repo::{DrugRepository, QuantityEdit};
use pharma_assure_backend::repository::filters::{AlertFilter, DrugFilter, MovementFilter, Page};
use pharma_assure_backend::repository::movement_repo::{MovementChange, MovementRepository};
use pharma_assure_backend::repository::repository_error::{RepositoryError, RepositoryResult};
use pharma_assure_backend::repository::user_repo::UserRepository;
use pharma_assure_backend::util::jwt::{JwtTokenUtils, JwtTokenUtilsImpl, TokenKind};
use pharma_assure_backend::util::minio::{MinioError, ObjectStore};
use pharma_assure_backend::util::password::{PasswordUtils, PasswordUtilsImpl};

pub const TEST_PASSWORD: &str = "s3cure-pass";

fn paginate<T: Clone>(items: Vec<T>, page: Page) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let rows = items
        .into_iter()
        .skip(page.skip() as usize)
        .take(page.limit as usize)
        .collect();
    (rows, total)
}

#[derive(Default)]
pub struct MemoryUserRepository {
    users: Mutex<Vec<User>>,
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert(&self, mut user: User) -> RepositoryResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::already_exists(format!("Duplicate key: email {}", user.email)));
        }
        user.id = Some(ObjectId::new());
        let now = Utc::now();
        user.created_at = Some(now);
        user.updated_at = Some(now);
        users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: ObjectId, mut user: User) -> RepositoryResult<User> {
        let mut users = self.users.lock().unwrap();
        let slot = users
            .iter_mut()
            .find(|u| u.id == Some(id))
            .ok_or_else(|| RepositoryError::not_found(format!("No user found to update for ID: {}", id)))?;
        user.id = Some(id);
        user.updated_at = Some(Utc::now());
        *slot = user.clone();
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let email = email.to_lowercase();
        Ok(self.users.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id.as_ref() == Some(id)).cloned())
    }

    async fn list(&self, role: Option<Role>) -> RepositoryResult<Vec<User>> {
        let mut users: Vec<User> = self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| role.map_or(true, |r| u.role == r && u.is_active))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }
}

#[derive(Default)]
pub struct MemoryDrugRepository {
    drugs: Mutex<Vec<Drug>>,
}

impl MemoryDrugRepository {
    pub fn snapshot(&self, id: ObjectId) -> Option<Drug> {
        self.drugs.lock().unwrap().iter().find(|d| d.id == Some(id)).cloned()
    }
}

#[async_trait]
impl DrugRepository for MemoryDrugRepository {
    async fn create(&self, mut drug: Drug) -> RepositoryResult<Drug> {
        let mut drugs = self.drugs.lock().unwrap();
        if drugs.iter().any(|d| d.batch_no == drug.batch_no || d.drug_id == drug.drug_id) {
            return Err(RepositoryError::already_exists(format!("Duplicate key: batchNo {}", drug.batch_no)));
        }
        drug.id = Some(ObjectId::new());
        let now = Utc::now();
        drug.created_at = Some(now);
        drug.updated_at = Some(now);
        drugs.push(drug.clone());
        Ok(drug)
    }

    async fn get_by_id(&self, id: ObjectId) -> RepositoryResult<Drug> {
        self.snapshot(id)
            .ok_or_else(|| RepositoryError::not_found(format!("Drug not found for ID: {}", id)))
    }

    async fn find_by_drug_id(&self, drug_id: &str) -> RepositoryResult<Option<Drug>> {
        Ok(self.drugs.lock().unwrap().iter().find(|d| d.drug_id == drug_id).cloned())
    }

    async fn find_by_batch(&self, batch_no: &str) -> RepositoryResult<Option<Drug>> {
        Ok(self.drugs.lock().unwrap().iter().find(|d| d.batch_no == batch_no).cloned())
    }

    async fn update(&self, id: ObjectId, mut drug: Drug, quantity: QuantityEdit) -> RepositoryResult<Drug> {
        let mut drugs = self.drugs.lock().unwrap();
        let slot = drugs
            .iter_mut()
            .find(|d| d.id == Some(id))
            .ok_or_else(|| RepositoryError::not_found(format!("No drug found to update for ID: {}", id)))?;
        drug.id = Some(id);
        drug.drug_id = slot.drug_id.clone();
        drug.created_by = slot.created_by;
        drug.created_at = slot.created_at;
        if quantity == QuantityEdit::Keep {
            drug.quantity = slot.quantity;
        }
        drug.refresh_stock_status();
        drug.updated_at = Some(Utc::now());
        *slot = drug.clone();
        Ok(drug)
    }

    async fn delete(&self, id: ObjectId) -> RepositoryResult<()> {
        let mut drugs = self.drugs.lock().unwrap();
        let before = drugs.len();
        drugs.retain(|d| d.id != Some(id));
        if drugs.len() == before {
            return Err(RepositoryError::not_found(format!("No drug found to delete for ID: {}", id)));
        }
        Ok(())
    }

    async fn list(&self, filter: &DrugFilter, page: Page) -> RepositoryResult<(Vec<Drug>, u64)> {
        let mut drugs: Vec<Drug> = self.drugs.lock().unwrap().iter().filter(|d| filter.matches(d)).cloned().collect();
        drugs.reverse();
        Ok(paginate(drugs, page))
    }

    async fn all(&self, filter: &DrugFilter) -> RepositoryResult<Vec<Drug>> {
        let mut drugs: Vec<Drug> = self.drugs.lock().unwrap().iter().filter(|d| filter.matches(d)).cloned().collect();
        drugs.sort_by_key(|d| d.expiry_date);
        Ok(drugs)
    }

    async fn adjust_quantity(&self, id: ObjectId, delta: i64) -> RepositoryResult<Option<Drug>> {
        let mut drugs = self.drugs.lock().unwrap();
        let Some(drug) = drugs.iter_mut().find(|d| d.id == Some(id)) else {
            return Ok(None);
        };
        if drug.quantity + delta < 0 {
            return Ok(None);
        }
        drug.quantity += delta;
        drug.stock_status = StockStatus::evaluate(drug.quantity, drug.min_threshold);
        drug.updated_at = Some(Utc::now());
        Ok(Some(drug.clone()))
    }
}

#[derive(Default)]
pub struct MemoryMovementRepository {
    movements: Mutex<Vec<Movement>>,
    lose_next_write: AtomicBool,
}

impl MemoryMovementRepository {
    /// Makes the next conditional status write fail as if another writer got there first.
    pub fn lose_next_write(&self) {
        self.lose_next_write.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl MovementRepository for MemoryMovementRepository {
    async fn create(&self, mut movement: Movement) -> RepositoryResult<Movement> {
        movement.id = Some(ObjectId::new());
        let now = Utc::now();
        movement.created_at = Some(now);
        movement.updated_at = Some(now);
        self.movements.lock().unwrap().push(movement.clone());
        Ok(movement)
    }

    async fn get_by_id(&self, id: ObjectId) -> RepositoryResult<Movement> {
        self.movements
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == Some(id))
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Movement not found for ID: {}", id)))
    }

    async fn find_by_movement_id(&self, movement_id: &str) -> RepositoryResult<Option<Movement>> {
        Ok(self.movements.lock().unwrap().iter().find(|m| m.movement_id == movement_id).cloned())
    }

    async fn record_event(
        &self,
        id: ObjectId,
        expected: MovementStatus,
        change: MovementChange,
        event: TrackingEvent,
    ) -> RepositoryResult<Movement> {
        if self.lose_next_write.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::conflict(format!("Movement {} is no longer {}", id, expected)));
        }
        let mut movements = self.movements.lock().unwrap();
        let slot = movements
            .iter_mut()
            .find(|m| m.id == Some(id) && m.status == expected)
            .ok_or_else(|| RepositoryError::conflict(format!("Movement {} is no longer {}", id, expected)))?;
        change.apply(slot);
        slot.tracking.push(event);
        slot.updated_at = Some(Utc::now());
        Ok(slot.clone())
    }

    async fn list(&self, filter: &MovementFilter, page: Page) -> RepositoryResult<(Vec<Movement>, u64)> {
        let mut movements: Vec<Movement> =
            self.movements.lock().unwrap().iter().filter(|m| filter.matches(m)).cloned().collect();
        movements.reverse();
        Ok(paginate(movements, page))
    }

    async fn all(&self, filter: &MovementFilter) -> RepositoryResult<Vec<Movement>> {
        let mut movements: Vec<Movement> =
            self.movements.lock().unwrap().iter().filter(|m| filter.matches(m)).cloned().collect();
        movements.reverse();
        Ok(movements)
    }
}

#[derive(Default)]
pub struct MemoryAlertRepository {
    alerts: Mutex<Vec<Alert>>,
}

impl MemoryAlertRepository {
    pub fn all(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertRepository for MemoryAlertRepository {
    async fn create(&self, mut alert: Alert) -> RepositoryResult<Alert> {
        alert.id = Some(ObjectId::new());
        alert.created_at = Some(Utc::now());
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(alert)
    }

    async fn list(&self, filter: &AlertFilter, page: Page) -> RepositoryResult<(Vec<Alert>, u64)> {
        let mut alerts: Vec<Alert> = self.alerts.lock().unwrap().iter().filter(|a| filter.matches(a)).cloned().collect();
        alerts.reverse();
        Ok(paginate(alerts, page))
    }

    async fn count(&self, filter: &AlertFilter) -> RepositoryResult<u64> {
        Ok(self.alerts.lock().unwrap().iter().filter(|a| filter.matches(a)).count() as u64)
    }

    async fn mark_read(&self, id: ObjectId) -> RepositoryResult<Alert> {
        let mut alerts = self.alerts.lock().unwrap();
        let alert = alerts
            .iter_mut()
            .find(|a| a.id == Some(id))
            .ok_or_else(|| RepositoryError::not_found(format!("Alert not found for ID: {}", id)))?;
        alert.is_read = true;
        Ok(alert.clone())
    }

    async fn mark_all_read(&self) -> RepositoryResult<u64> {
        let mut flipped = 0;
        for alert in self.alerts.lock().unwrap().iter_mut().filter(|a| !a.is_read) {
            alert.is_read = true;
            flipped += 1;
        }
        Ok(flipped)
    }

    async fn resolve(&self, id: ObjectId, resolved_by: Option<ObjectId>) -> RepositoryResult<Alert> {
        let mut alerts = self.alerts.lock().unwrap();
        let alert = alerts
            .iter_mut()
            .find(|a| a.id == Some(id))
            .ok_or_else(|| RepositoryError::not_found(format!("Alert not found for ID: {}", id)))?;
        alert.is_resolved = true;
        alert.is_read = true;
        alert.resolved_by = resolved_by;
        alert.resolved_at = Some(Utc::now());
        Ok(alert.clone())
    }

    async fn find_open(&self, drug: ObjectId, alert_type: AlertType) -> RepositoryResult<Option<Alert>> {
        Ok(self
            .alerts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.drug == Some(drug) && a.alert_type == alert_type && !a.is_resolved)
            .cloned())
    }

    async fn resolve_open_for_drug(
        &self,
        drug: ObjectId,
        types: &[AlertType],
        resolved_by: Option<ObjectId>,
    ) -> RepositoryResult<u64> {
        let mut resolved = 0;
        for alert in self
            .alerts
            .lock()
            .unwrap()
            .iter_mut()
            .filter(|a| a.drug == Some(drug) && types.contains(&a.alert_type) && !a.is_resolved)
        {
            alert.is_resolved = true;
            alert.resolved_by = resolved_by;
            alert.resolved_at = Some(Utc::now());
            resolved += 1;
        }
        Ok(resolved)
    }
}

#[derive(Default)]
pub struct MemoryObjectStore {
    pub objects: Mutex<HashMap<String, (Vec<u8>, Option<String>)>>,
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, object_name: &str, data: Vec<u8>, content_type: Option<&str>) -> Result<(), MinioError> {
        self.objects
            .lock()
            .unwrap()
            .insert(object_name.to_string(), (data, content_type.map(str::to_string)));
        Ok(())
    }

    async fn remove_object(&self, object_name: &str) -> Result<(), MinioError> {
        match self.objects.lock().unwrap().remove(object_name) {
            Some(_) => Ok(()),
            None => Err(MinioError::ObjectNotFound(object_name.to_string())),
        }
    }

    fn object_url(&self, object_name: &str) -> String {
        format!("http://files.test/pharma-assure/{}", object_name)
    }
}

pub struct TestApp {
    pub router: Router,
    pub services: AppServices,
    pub users: Arc<MemoryUserRepository>,
    pub drugs: Arc<MemoryDrugRepository>,
    pub movements: Arc<MemoryMovementRepository>,
    pub alerts: Arc<MemoryAlertRepository>,
    pub store: Arc<MemoryObjectStore>,
    pub jwt_utils: Arc<JwtTokenUtilsImpl>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_upload_config(UploadConfig { max_bytes: 1024, max_files: 3 })
    }

    pub fn with_upload_config(upload_config: UploadConfig) -> Self {
        let users = Arc::new(MemoryUserRepository::default());
        let drugs = Arc::new(MemoryDrugRepository::default());
        let movements = Arc::new(MemoryMovementRepository::default());
        let alerts = Arc::new(MemoryAlertRepository::default());
        let store = Arc::new(MemoryObjectStore::default());
        let jwt_utils = Arc::new(JwtTokenUtilsImpl::new(JwtConfig::default()));

        let repos = Repositories {
            users: users.clone(),
            drugs: drugs.clone(),
            movements: movements.clone(),
            alerts: alerts.clone(),
        };
        let services = AppServices::new(repos, store.clone(), jwt_utils.clone(), AlertConfig::default(), upload_config.clone());
        let router = build_router(&services, &upload_config);

        TestApp { router, services, users, drugs, movements, alerts, store, jwt_utils }
    }

    /// Stores a user directly and returns it with an access token.
    pub async fn seed_user(&self, name: &str, role: Role) -> (User, String) {
        let email = format!("{}@pharma.test", name.to_lowercase().replace(' ', "."));
        let user = User {
            id: None,
            name: name.to_string(),
            email: email.clone(),
            password_hash: PasswordUtilsImpl::hash_password(TEST_PASSWORD).unwrap(),
            role,
            phone: None,
            is_active: true,
            created_at: None,
            updated_at: None,
        };
        let user = self.users.insert(user).await.unwrap();
        let token = self
            .jwt_utils
            .issue(TokenKind::Access, user.id.unwrap(), &email, role)
            .unwrap();
        (user, token)
    }

    pub async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send_request(request).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, json)
    }

    /// Creates a drug through the API and returns its JSON.
    pub async fn create_drug(&self, token: &str, batch_no: &str, quantity: i64, expiry_date: &str) -> Value {
        let (status, body) = self
            .send("POST", "/api/drugs", Some(token), Some(drug_body(batch_no, quantity, expiry_date)))
            .await;
        assert_eq!(status, StatusCode::CREATED, "drug creation failed: {}", body);
        body["drug"].clone()
    }
}

pub fn drug_body(batch_no: &str, quantity: i64, expiry_date: &str) -> Value {
    serde_json::json!({
        "name": "Amoxicillin 500mg",
        "genericName": "Amoxicillin",
        "category": "antibiotics",
        "batchNo": batch_no,
        "quantity": quantity,
        "unit": "capsules",
        "price": 2.5,
        "manufacturer": "Acme Pharma",
        "supplier": "MedSupply",
        "manufactureDate": "2024-01-01",
        "expiryDate": expiry_date,
        "location": "central-warehouse",
        "minThreshold": 10,
        "maxThreshold": 1000
    })
}

/// A date `days` from today, formatted for request bodies.
pub fn days_from_today(days: i64) -> String {
    (Utc::now().date_naive() + chrono::Duration::days(days)).format("%Y-%m-%d").to_string()
}
