//! Background job scheduler.
//!
//! Registers the daily stage-and-sync job when `PCSYNC_SYNC_CRON` is set.

use std::sync::Arc;

use chrono::Local;
use pcsync_core::AppConfig;
use pcsync_shopify::ShopifyClient;
use pcsync_source::SourceClient;
use pcsync_sync::Mailer;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Everything the daily job needs, shared with the HTTP handlers.
#[derive(Clone)]
pub struct JobContext {
    pub config: Arc<AppConfig>,
    pub source: Arc<SourceClient>,
    pub shopify: Arc<ShopifyClient>,
    pub mailer: Option<Arc<Mailer>>,
}

/// Builds and starts the scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the cron expression is invalid or the
/// scheduler cannot be started.
pub async fn build_scheduler(context: JobContext) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    match context.config.sync_cron.clone() {
        Some(cron) => register_daily_sync_job(&scheduler, &cron, context).await?,
        None => tracing::info!("PCSYNC_SYNC_CRON not set; daily sync will not be scheduled"),
    }

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the daily stage-and-sync job on `cron` (six fields, seconds
/// first, e.g. `0 0 6 * * *`).
async fn register_daily_sync_job(
    scheduler: &JobScheduler,
    cron: &str,
    context: JobContext,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let context = context.clone();

        Box::pin(async move {
            tracing::info!("scheduler: starting daily sync");
            run_daily_job(&context).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: daily sync registered");
    Ok(())
}

async fn run_daily_job(context: &JobContext) {
    let today = Local::now().date_naive();
    let result = pcsync_sync::run_daily(
        &context.config,
        &context.source,
        &context.shopify,
        context.mailer.as_deref(),
        today,
    )
    .await;

    match result {
        Ok(report) => tracing::info!(
            outcome = ?report.outcome(),
            changed = report.applied(),
            failed = report.failed.len(),
            "scheduler: daily sync complete"
        ),
        Err(e) => tracing::error!(error = %e, "scheduler: daily sync failed"),
    }
}
