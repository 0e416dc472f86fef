use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertType {
    LowStock,
    OutOfStock,
    Expiring,
    Expired,
    Movement,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::LowStock => "low-stock",
            AlertType::OutOfStock => "out-of-stock",
            AlertType::Expiring => "expiring",
            AlertType::Expired => "expired",
            AlertType::Movement => "movement",
        }
    }

    pub fn is_stock(&self) -> bool {
        matches!(self, AlertType::LowStock | AlertType::OutOfStock)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub drug: Option<ObjectId>,
    pub movement: Option<ObjectId>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub is_resolved: bool,
    pub resolved_by: Option<ObjectId>,
    #[serde(default, with = "crate::util::timestamp::option")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::util::timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn new(alert_type: AlertType, severity: Severity, title: impl Into<String>, message: impl Into<String>) -> Self {
        Alert {
            id: None,
            alert_type,
            severity,
            title: title.into(),
            message: message.into(),
            drug: None,
            movement: None,
            is_read: false,
            is_resolved: false,
            resolved_by: None,
            resolved_at: None,
            created_at: None,
        }
    }

    pub fn for_drug(mut self, drug: Option<ObjectId>) -> Self {
        self.drug = drug;
        self
    }

    pub fn for_movement(mut self, movement: Option<ObjectId>) -> Self {
        self.movement = movement;
        self
    }
}
