pub mod alert;
pub mod drug;
pub mod movement;
pub mod user;
