pub mod alert_router;
pub mod drug_router;
pub mod movement_router;
pub mod report_router;
pub mod socket_router;
pub mod upload_router;
pub mod user_router;
