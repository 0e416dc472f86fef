pub mod ids;
pub mod error;
pub mod jwt;
pub mod logger;
pub mod minio;
pub mod password;
pub mod qr;
pub mod timestamp;
