use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::AlertConfig;
use crate::service::alert_service::AlertService;

/// Starts the stock and expiry scans on their configured schedules.
///
/// The returned scheduler keeps running until it is shut down; each scan logs
/// its own failures instead of stopping the schedule.
pub async fn schedule_alert_scans(
    alert_service: Arc<dyn AlertService>,
    config: &AlertConfig,
) -> Result<JobScheduler, Box<dyn std::error::Error>> {
    let sched = JobScheduler::new().await?;

    let stock_service = alert_service.clone();
    let stock_job = Job::new_async(config.stock_scan_cron.as_str(), move |_uuid, _l| {
        let service = stock_service.clone();
        Box::pin(async move {
            match service.run_stock_scan().await {
                Ok(raised) => info!(raised, "Stock scan completed"),
                Err(e) => error!("Stock scan failed: {}", e),
            }
        })
    })
    .map_err(|e| {
        error!("Failed to create stock scan job: {}", e);
        Box::new(e) as Box<dyn std::error::Error>
    })?;

    let expiry_service = alert_service;
    let expiry_job = Job::new_async(config.expiry_scan_cron.as_str(), move |_uuid, _l| {
        let service = expiry_service.clone();
        Box::pin(async move {
            match service.run_expiry_scan().await {
                Ok(raised) => info!(raised, "Expiry scan completed"),
                Err(e) => error!("Expiry scan failed: {}", e),
            }
        })
    })
    .map_err(|e| {
        error!("Failed to create expiry scan job: {}", e);
        Box::new(e) as Box<dyn std::error::Error>
    })?;

    for job in [stock_job, expiry_job] {
        sched.add(job).await.map_err(|e| {
            error!("Failed to add job to scheduler: {}", e);
            Box::new(e) as Box<dyn std::error::Error>
        })?;
    }

    sched.start().await?;
    info!(
        stock_cron = %config.stock_scan_cron,
        expiry_cron = %config.expiry_scan_cron,
        "Alert scheduler started"
    );
    Ok(sched)
}
