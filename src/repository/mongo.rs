use bson::doc;
use mongodb::options::{ClientOptions, Credential, IndexOptions, ResolverConfig};
use mongodb::{Client, Database, IndexModel};
use tracing::{info, instrument};

use crate::config::MongoConfig;

pub const USERS: &str = "users";
pub const DRUGS: &str = "drugs";
pub const MOVEMENTS: &str = "movements";
pub const ALERTS: &str = "alerts";

/// Opens one pooled client and hands back the configured database.
#[instrument(skip(config), fields(database = %config.database))]
pub async fn connect(config: &MongoConfig) -> Result<Database, mongodb::error::Error> {
    let mut client_options = ClientOptions::parse_with_resolver_config(&config.uri, ResolverConfig::cloudflare()).await?;
    client_options.app_name = Some("PharmaAssure".to_string());
    client_options.max_pool_size = Some(config.pool_size);
    client_options.connect_timeout = Some(std::time::Duration::from_secs(config.connection_timeout_secs));
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        client_options.credential = Some(
            Credential::builder()
                .username(username.clone())
                .password(password.clone())
                .build(),
        );
    }

    let client = Client::with_options(client_options)?;
    let db = client.database(&config.database);
    db.run_command(doc! { "ping": 1 }, None).await?;
    info!("Connected to MongoDB");
    Ok(db)
}

/// Creates the unique indexes backing batch and email uniqueness, plus the lookup indexes.
#[instrument(skip(db))]
pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let unique = || IndexOptions::builder().unique(true).build();

    db.collection::<bson::Document>(USERS)
        .create_index(IndexModel::builder().keys(doc! { "email": 1 }).options(unique()).build(), None)
        .await?;

    let drugs = db.collection::<bson::Document>(DRUGS);
    drugs
        .create_index(IndexModel::builder().keys(doc! { "batchNo": 1 }).options(unique()).build(), None)
        .await?;
    drugs
        .create_index(IndexModel::builder().keys(doc! { "drugId": 1 }).options(unique()).build(), None)
        .await?;
    drugs
        .create_index(IndexModel::builder().keys(doc! { "expiryDate": 1 }).build(), None)
        .await?;

    let movements = db.collection::<bson::Document>(MOVEMENTS);
    movements
        .create_index(IndexModel::builder().keys(doc! { "movementId": 1 }).options(unique()).build(), None)
        .await?;
    movements
        .create_index(IndexModel::builder().keys(doc! { "status": 1, "createdAt": -1 }).build(), None)
        .await?;

    db.collection::<bson::Document>(ALERTS)
        .create_index(IndexModel::builder().keys(doc! { "drug": 1, "type": 1, "isResolved": 1 }).build(), None)
        .await?;

    info!("MongoDB indexes ensured");
    Ok(())
}
