pub mod alert_service;
pub mod drug_service;
pub mod movement_service;
pub mod notification_hub;
pub mod report_service;
pub mod upload_service;
pub mod user_service;
