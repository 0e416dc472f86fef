use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::dto::common::{blank_as_none, blank_as_none_parsed, hex, hex_opt};
use crate::model::alert::{Alert, AlertType, Severity};
use crate::repository::filters::{AlertFilter, Page};

pub const DEFAULT_EXPIRY_WINDOW_DAYS: i64 = 30;
/// Widest look-ahead accepted by the expiry endpoints, about ten years.
pub const MAX_EXPIRY_WINDOW_DAYS: i64 = 3650;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertQuery {
    #[serde(default, rename = "type", deserialize_with = "blank_as_none")]
    pub alert_type: Option<AlertType>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub severity: Option<Severity>,
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    pub is_read: Option<bool>,
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    pub is_resolved: Option<bool>,
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    pub limit: Option<u32>,
}

impl AlertQuery {
    pub fn filter(&self) -> AlertFilter {
        AlertFilter {
            alert_type: self.alert_type,
            severity: self.severity,
            is_read: self.is_read,
            is_resolved: self.is_resolved,
        }
    }

    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ExpiryQuery {
    #[validate(range(min = 0, max = 3650))]
    #[serde(default, deserialize_with = "blank_as_none_parsed")]
    pub days: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertRequest {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub severity: Option<Severity>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub drug: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub movement: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertResponse {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub drug: Option<String>,
    pub movement: Option<String>,
    pub is_read: bool,
    pub is_resolved: bool,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Alert> for AlertResponse {
    fn from(alert: Alert) -> Self {
        AlertResponse {
            id: hex(&alert.id),
            alert_type: alert.alert_type,
            severity: alert.severity,
            title: alert.title,
            message: alert.message,
            drug: hex_opt(&alert.drug),
            movement: hex_opt(&alert.movement),
            is_read: alert.is_read,
            is_resolved: alert.is_resolved,
            resolved_by: hex_opt(&alert.resolved_by),
            resolved_at: alert.resolved_at,
            created_at: alert.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertListResponse {
    pub success: bool,
    pub alerts: Vec<AlertResponse>,
    pub total: u64,
    pub unread_count: u64,
    pub page: u64,
    pub pages: u64,
}

#[derive(Debug, Serialize)]
pub struct AlertEnvelope {
    pub success: bool,
    pub alert: AlertResponse,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStats {
    pub total: u64,
    pub unread: u64,
    pub unresolved: u64,
    pub critical: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_parses_flags_from_text() {
        let query: AlertQuery =
            serde_json::from_str(r#"{"type":"low-stock","isRead":"false","limit":"5"}"#).unwrap();
        let filter = query.filter();
        assert_eq!(filter.alert_type, Some(AlertType::LowStock));
        assert_eq!(filter.is_read, Some(false));
        assert_eq!(query.page().limit, 5);
    }
}
