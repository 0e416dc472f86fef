mod common;

use axum::http::StatusCode;
use pharma_assure_backend::model::alert::AlertType;
use pharma_assure_backend::model::user::Role;
use pharma_assure_backend::service::alert_service::AlertService;
use pharma_assure_backend::service::notification_hub::NEW_ALERT;
use serde_json::json;

use common::{days_from_today, TestApp};

#[tokio::test]
async fn test_list_filters_by_type_and_counts_unread() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("Warehouse Lead", Role::Warehouse).await;

    app.create_drug(&token, "LOW-1", 5, &days_from_today(400)).await;
    app.create_drug(&token, "EMPTY-1", 0, &days_from_today(400)).await;
    app.create_drug(&token, "SOON-1", 200, &days_from_today(20)).await;

    let (status, body) = app.send("GET", "/api/alerts", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["unreadCount"], 3);

    let (_, body) = app.send("GET", "/api/alerts?type=low-stock", Some(&token), None).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["alerts"][0]["severity"], "warning");

    let (_, body) = app.send("GET", "/api/alerts?severity=critical", Some(&token), None).await;
    assert_eq!(body["total"], 2);

    let (_, body) = app.send("GET", "/api/alerts?limit=1&page=2", Some(&token), None).await;
    assert_eq!(body["alerts"].as_array().unwrap().len(), 1);
    assert_eq!(body["pages"], 3);
}

#[tokio::test]
async fn test_mark_read_and_read_all() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("Pharmacist", Role::Pharmacist).await;
    let (_, warehouse) = app.seed_user("Warehouse Lead", Role::Warehouse).await;
    app.create_drug(&warehouse, "LOW-1", 5, &days_from_today(400)).await;
    app.create_drug(&warehouse, "LOW-2", 3, &days_from_today(400)).await;

    let (_, body) = app.send("GET", "/api/alerts", Some(&token), None).await;
    let id = body["alerts"][0]["_id"].as_str().unwrap().to_string();

    let (status, body) = app.send("PUT", &format!("/api/alerts/{}/read", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alert"]["isRead"], true);

    let (_, body) = app.send("GET", "/api/alerts?isRead=false", Some(&token), None).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["unreadCount"], 1);

    let (status, body) = app.send("PUT", "/api/alerts/read-all", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "1 alerts marked as read");

    let (_, body) = app.send("GET", "/api/alerts", Some(&token), None).await;
    assert_eq!(body["unreadCount"], 0);
}

#[tokio::test]
async fn test_resolve_records_resolver() {
    let app = TestApp::new();
    let (user, token) = app.seed_user("Warehouse Lead", Role::Warehouse).await;
    app.create_drug(&token, "LOW-1", 5, &days_from_today(400)).await;
    let alert = app.alerts.all().remove(0);
    let id = alert.id.unwrap().to_hex();

    let (status, body) = app.send("PUT", &format!("/api/alerts/{}/resolve", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alert"]["isResolved"], true);
    assert_eq!(body["alert"]["resolvedBy"], user.id.unwrap().to_hex());
    assert!(body["alert"]["resolvedAt"].is_string());

    let (_, body) = app.send("GET", "/api/alerts?isResolved=false", Some(&token), None).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_unknown_or_malformed_alert_ids() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("Pharmacist", Role::Pharmacist).await;

    let (status, _) = app.send("PUT", "/api/alerts/not-an-id/read", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send("PUT", "/api/alerts/65a000000000000000000000/resolve", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send("GET", "/api/alerts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expiry_window() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("Warehouse Lead", Role::Warehouse).await;
    app.create_drug(&token, "SOON-1", 100, &days_from_today(10)).await;
    app.create_drug(&token, "LATER-1", 100, &days_from_today(60)).await;
    app.create_drug(&token, "FAR-1", 100, &days_from_today(400)).await;

    let (status, body) = app.send("GET", "/api/alerts/expiry", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["drugs"][0]["batchNo"], "SOON-1");

    let (_, body) = app.send("GET", "/api/alerts/expiry?days=90", Some(&token), None).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["drugs"][0]["batchNo"], "SOON-1");

    let (status, _) = app.send("GET", "/api/alerts/expiry?days=-1", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_expiry_window_is_bounded() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("Warehouse Lead", Role::Warehouse).await;
    app.create_drug(&token, "FAR-1", 100, &days_from_today(400)).await;

    let (status, body) = app.send("GET", "/api/alerts/expiry?days=3650", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    for days in ["3651", "9000000000000", "-9000000000000"] {
        let uri = format!("/api/alerts/expiry?days={}", days);
        let (status, body) = app.send("GET", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "days={} {}", days, body);
    }

    assert!(app.services.alerts.expiring_drugs(9_000_000_000_000).await.is_err());
}

#[tokio::test]
async fn test_low_stock_lists_low_and_empty_drugs() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("Warehouse Lead", Role::Warehouse).await;
    app.create_drug(&token, "LOW-1", 5, &days_from_today(400)).await;
    app.create_drug(&token, "EMPTY-1", 0, &days_from_today(400)).await;
    app.create_drug(&token, "FULL-1", 500, &days_from_today(400)).await;

    let (status, body) = app.send("GET", "/api/alerts/low-stock", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    let statuses: Vec<&str> = body["drugs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["stockStatus"].as_str().unwrap())
        .collect();
    assert!(statuses.contains(&"low-stock"));
    assert!(statuses.contains(&"out-of-stock"));
}

#[tokio::test]
async fn test_manual_alert_is_admin_only_and_broadcast() {
    let app = TestApp::new();
    let (_, admin) = app.seed_user("Admin", Role::Admin).await;
    let (_, pharmacist) = app.seed_user("Pharmacist", Role::Pharmacist).await;
    let drug = app.create_drug(&admin, "BATCH-1", 500, &days_from_today(400)).await;
    let mut events = app.services.hub.subscribe();

    let body = json!({
        "type": "movement",
        "title": "Cold chain check",
        "message": "Verify the fridge log before dispatch",
        "drug": drug["_id"],
    });
    let (status, _) = app.send("POST", "/api/alerts", Some(&pharmacist), Some(body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = app.send("POST", "/api/alerts", Some(&admin), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["alert"]["severity"], "info");
    assert_eq!(created["alert"]["drug"], drug["_id"]);

    let dispatch = events.try_recv().unwrap();
    assert_eq!(dispatch.envelope.event, NEW_ALERT);
    assert_eq!(dispatch.envelope.data["title"], "Cold chain check");

    let (status, _) = app
        .send(
            "POST",
            "/api/alerts",
            Some(&admin),
            Some(json!({
                "type": "low-stock",
                "title": "Ghost",
                "message": "No such drug",
                "drug": "65a000000000000000000000",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_scans_do_not_duplicate_open_alerts() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("Warehouse Lead", Role::Warehouse).await;
    app.create_drug(&token, "LOW-1", 5, &days_from_today(400)).await;
    app.create_drug(&token, "SOON-1", 200, &days_from_today(45)).await;
    assert_eq!(app.alerts.all().len(), 2);

    assert_eq!(app.services.alerts.run_stock_scan().await.unwrap(), 0);
    assert_eq!(app.services.alerts.run_expiry_scan().await.unwrap(), 0);

    let low = app
        .alerts
        .all()
        .into_iter()
        .find(|a| a.alert_type == AlertType::LowStock)
        .unwrap();
    let id = low.id.unwrap().to_hex();
    app.send("PUT", &format!("/api/alerts/{}/resolve", id), Some(&token), None).await;

    assert_eq!(app.services.alerts.run_stock_scan().await.unwrap(), 1);
    assert_eq!(app.services.alerts.run_stock_scan().await.unwrap(), 0);
    assert_eq!(app.alerts.all().len(), 3);

    let expiring = app
        .alerts
        .all()
        .into_iter()
        .find(|a| a.alert_type == AlertType::Expiring)
        .unwrap();
    assert_eq!(expiring.severity.as_str(), "warning");
}
