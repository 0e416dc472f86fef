pub mod alert_repo;
pub mod drug_repo;
pub mod filters;
pub mod mongo;
pub mod movement_repo;
pub mod repository_error;
pub mod user_repo;
