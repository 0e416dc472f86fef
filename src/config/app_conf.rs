use std::env;
use tracing::warn;

pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Origin allowed by CORS, the SPA's URL.
    pub client_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5000);
        let client_url = env::var("CLIENT_URL").unwrap_or_else(|_| {
            warn!("CLIENT_URL not set, allowing http://localhost:5173");
            "http://localhost:5173".to_string()
        });
        AppConfig { host, port, client_url }
    }
}
