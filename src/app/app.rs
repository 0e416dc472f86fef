use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_cron_scheduler::JobScheduler;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::config::{AdminUserConfig, AlertConfig, AppConfig, JwtConfig, MinioConfig, MongoConfig, UploadConfig};
use crate::handler::health_handler::{health_handler, root_handler};
use crate::handler::socket_handler::SocketState;
use crate::jobs::alert_cron::schedule_alert_scans;
use crate::repository::alert_repo::{AlertRepository, MongoAlertRepository};
use crate::repository::drug_repo::{DrugRepository, MongoDrugRepository};
use crate::repository::mongo;
use crate::repository::movement_repo::{MongoMovementRepository, MovementRepository};
use crate::repository::user_repo::{UserRepository, UserRepositoryImpl};
use crate::router::alert_router::alert_router;
use crate::router::drug_router::drug_router;
use crate::router::movement_router::movement_router;
use crate::router::report_router::report_router;
use crate::router::socket_router::socket_router;
use crate::router::upload_router::upload_router;
use crate::router::user_router::user_router;
use crate::service::alert_service::{AlertService, AlertServiceImpl};
use crate::service::drug_service::{DrugService, DrugServiceImpl};
use crate::service::movement_service::{MovementService, MovementServiceImpl};
use crate::service::notification_hub::NotificationHub;
use crate::service::report_service::{ReportService, ReportServiceImpl};
use crate::service::upload_service::{UploadService, UploadServiceImpl};
use crate::service::user_service::{UserService, UserServiceImpl};
use crate::util::jwt::JwtTokenUtilsImpl;
use crate::util::minio::{MinioService, ObjectStore};

const HUB_CAPACITY: usize = 256;

/// Storage seams the services are built on.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub drugs: Arc<dyn DrugRepository>,
    pub movements: Arc<dyn MovementRepository>,
    pub alerts: Arc<dyn AlertRepository>,
}

#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<dyn UserService>,
    pub drugs: Arc<dyn DrugService>,
    pub movements: Arc<dyn MovementService>,
    pub alerts: Arc<dyn AlertService>,
    pub reports: Arc<dyn ReportService>,
    pub uploads: Arc<dyn UploadService>,
    pub hub: Arc<NotificationHub>,
    pub jwt_utils: Arc<JwtTokenUtilsImpl>,
}

impl AppServices {
    pub fn new(
        repos: Repositories,
        store: Arc<dyn ObjectStore>,
        jwt_utils: Arc<JwtTokenUtilsImpl>,
        alert_config: AlertConfig,
        upload_config: UploadConfig,
    ) -> Self {
        let hub = Arc::new(NotificationHub::new(HUB_CAPACITY));
        let alerts: Arc<dyn AlertService> = Arc::new(AlertServiceImpl::new(
            repos.alerts.clone(),
            repos.drugs.clone(),
            hub.clone(),
            alert_config,
        ));
        let drugs: Arc<dyn DrugService> =
            Arc::new(DrugServiceImpl::new(repos.drugs.clone(), alerts.clone(), hub.clone()));
        let movements: Arc<dyn MovementService> = Arc::new(MovementServiceImpl::new(
            repos.movements.clone(),
            repos.users.clone(),
            drugs.clone(),
            alerts.clone(),
            hub.clone(),
        ));
        let reports: Arc<dyn ReportService> =
            Arc::new(ReportServiceImpl::new(repos.drugs, repos.movements, alerts.clone()));
        let users: Arc<dyn UserService> = Arc::new(UserServiceImpl::new(repos.users, jwt_utils.clone()));
        let uploads: Arc<dyn UploadService> = Arc::new(UploadServiceImpl::new(store, upload_config));

        AppServices { users, drugs, movements, alerts, reports, uploads, hub, jwt_utils }
    }
}

/// Every route of the API, without CORS.
pub fn build_router(services: &AppServices, upload_config: &UploadConfig) -> Router {
    let jwt = services.jwt_utils.clone();
    let api = Router::new()
        .route("/health", get(health_handler))
        .merge(user_router(services.users.clone(), jwt.clone()))
        .merge(drug_router(services.drugs.clone(), jwt.clone()))
        .merge(movement_router(services.movements.clone(), jwt.clone()))
        .merge(alert_router(services.alerts.clone(), jwt.clone()))
        .merge(report_router(services.reports.clone(), jwt.clone()))
        .merge(upload_router(services.uploads.clone(), jwt.clone(), upload_config));

    Router::new()
        .route("/", get(root_handler))
        .nest("/api", api)
        .merge(socket_router(SocketState { hub: services.hub.clone(), jwt_utils: jwt }))
}

fn cors_layer(client_url: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60));
    match client_url.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            warn!("CLIENT_URL is not a valid origin ({}), cross-origin requests will be refused", e);
            cors
        }
    }
}

pub struct App {
    config: AppConfig,
    router: Router,
    scheduler: Option<JobScheduler>,
}

impl App {
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let config = AppConfig::from_env();
        let jwt_config = JwtConfig::from_env()?;
        let mongo_config = MongoConfig::from_env()?;
        let minio_config = MinioConfig::from_env()?;
        let alert_config = AlertConfig::from_env()?;
        let upload_config = UploadConfig::from_env()?;

        let db = mongo::connect(&mongo_config).await?;
        mongo::ensure_indexes(&db).await?;
        let repos = Repositories {
            users: Arc::new(UserRepositoryImpl::new(&db)),
            drugs: Arc::new(MongoDrugRepository::new(&db)),
            movements: Arc::new(MongoMovementRepository::new(&db)),
            alerts: Arc::new(MongoAlertRepository::new(&db)),
        };
        let store: Arc<dyn ObjectStore> = Arc::new(MinioService::new(minio_config).await?);
        let jwt_utils = Arc::new(JwtTokenUtilsImpl::new(jwt_config));

        let services = AppServices::new(repos, store, jwt_utils, alert_config.clone(), upload_config.clone());
        Self::create_first_admin_user(services.users.as_ref()).await;

        let scheduler = if alert_config.jobs_enabled {
            Some(schedule_alert_scans(services.alerts.clone(), &alert_config).await?)
        } else {
            info!("Alert jobs disabled");
            None
        };

        let router = build_router(&services, &upload_config).layer(cors_layer(&config.client_url));
        Ok(App { config, router, scheduler })
    }

    pub async fn start(self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = SocketAddr::new(self.config.host.parse()?, self.config.port);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("🚀 Server running at http://{}", addr);
        axum::serve(listener, self.router).with_graceful_shutdown(shutdown_signal()).await?;

        if let Some(mut scheduler) = self.scheduler {
            if let Err(e) = scheduler.shutdown().await {
                error!("Failed to stop alert scheduler: {}", e);
            }
        }
        info!("Server stopped");
        Ok(())
    }

    async fn create_first_admin_user(users: &dyn UserService) {
        let admin_conf = match AdminUserConfig::from_env() {
            Ok(c) => c,
            Err(e) => {
                warn!("Admin user config not loaded: {e}");
                return;
            }
        };
        match users.ensure_admin(&admin_conf).await {
            Ok(true) => info!("First admin user created."),
            Ok(false) => info!("Admin user already exists, skipping creation."),
            Err(e) => error!("Failed to create admin user: {e}"),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
