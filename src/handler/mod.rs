pub mod alert_handler;
pub mod drug_handler;
pub mod health_handler;
pub mod movement_handler;
pub mod report_handler;
pub mod socket_handler;
pub mod upload_handler;
pub mod user_handler;
