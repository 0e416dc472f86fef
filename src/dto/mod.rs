pub mod alert_dto;
pub mod common;
pub mod drug_dto;
pub mod movement_dto;
pub mod report_dto;
pub mod upload_dto;
pub mod user_dto;
