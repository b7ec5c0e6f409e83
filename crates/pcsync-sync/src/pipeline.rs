//! The daily job: stage yesterday's source changes, then reconcile them
//! against Shopify and report.

use std::time::Duration;

use chrono::NaiveDate;
use pcsync_core::AppConfig;
use pcsync_shopify::{ShopifyClient, ShopifyError};
use pcsync_source::{SourceClient, SourceError};

use crate::error::SyncError;
use crate::mail::{deliver_report, log_report, Mailer};
use crate::reconcile::{apply, index_catalog, plan, ApplyOptions, PlannedAction};
use crate::report::ChangeReport;
use crate::staging::{read_snapshot, snapshot_path, stage_yesterday};

#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Which day's snapshot to reconcile.
    pub date: NaiveDate,
    pub dry_run: bool,
}

/// Source client configured from the environment.
///
/// # Errors
///
/// See [`SourceClient::new`].
pub fn build_source_client(config: &AppConfig) -> Result<SourceClient, SourceError> {
    Ok(SourceClient::new(
        &config.source_base_url,
        &config.source_username,
        &config.source_password,
        config.http_timeout_secs,
    )?
    .with_token_ttl(Duration::from_secs(config.source_token_ttl_secs))
    .with_retry(
        config.http_max_retries,
        config.http_backoff_base_secs.saturating_mul(1_000),
    ))
}

/// Shopify client configured from the environment.
///
/// # Errors
///
/// See [`ShopifyClient::new`].
pub fn build_shopify_client(config: &AppConfig) -> Result<ShopifyClient, ShopifyError> {
    ShopifyClient::new(
        &config.shop_name,
        &config.shopify_api_version,
        &config.shopify_access_token,
        config.http_timeout_secs,
        config.http_max_retries,
        config.http_backoff_base_secs,
    )
}

/// Reconciles the snapshot for `options.date` against the live catalog.
///
/// An empty snapshot ends the run early with an empty report and no email.
/// Dry runs plan and report without writing to Shopify or sending mail.
///
/// # Errors
///
/// - [`SyncError::SnapshotMissing`] if no snapshot exists for the date.
/// - [`SyncError::Shopify`] if the catalog or location lookup fails.
///   Failures of individual actions are recorded in the report instead.
pub async fn run_sync(
    config: &AppConfig,
    shopify: &ShopifyClient,
    mailer: Option<&Mailer>,
    options: SyncOptions,
) -> Result<ChangeReport, SyncError> {
    let path = snapshot_path(&config.staging_dir, options.date);
    let rows = read_snapshot(&path)?;
    if rows.is_empty() {
        tracing::info!(path = %path.display(), "snapshot is empty; nothing to sync");
        return Ok(ChangeReport {
            dry_run: options.dry_run,
            ..ChangeReport::default()
        });
    }

    let catalog = shopify
        .fetch_catalog(config.shopify_request_delay_ms)
        .await?;
    let index = index_catalog(&catalog);
    tracing::info!(
        listings = catalog.len(),
        linked = index.len(),
        rows = rows.len(),
        "indexed Shopify catalog"
    );

    let actions = plan(&rows, &index, config.product_margin, config.create_missing);
    let needs_location = actions
        .iter()
        .any(|a| matches!(a, PlannedAction::Update { .. } | PlannedAction::Pause { .. }));
    let location_id = match config.shopify_location_id {
        Some(id) => id,
        None if needs_location && !options.dry_run => shopify.primary_location_id().await?,
        None => 0,
    };

    let apply_options = ApplyOptions {
        location_id,
        request_delay: Duration::from_millis(config.shopify_request_delay_ms),
        supplier_name: config.supplier_name.clone(),
        dry_run: options.dry_run,
    };
    let report = apply(actions, shopify, &apply_options).await;

    tracing::info!(
        outcome = ?report.outcome(),
        created = report.created.len(),
        updated = report.updated.len(),
        paused = report.paused.len(),
        failed = report.failed.len(),
        unchanged = report.unchanged,
        skipped = report.skipped,
        dry_run = options.dry_run,
        "sync finished"
    );

    if options.dry_run {
        log_report(&report, "dry run report");
    } else {
        deliver_report(mailer, &report).await;
    }
    Ok(report)
}

/// Stages yesterday's changes into today's snapshot, then syncs it.
///
/// # Errors
///
/// Staging errors (source API, file I/O) and the errors of [`run_sync`].
pub async fn run_daily(
    config: &AppConfig,
    source: &SourceClient,
    shopify: &ShopifyClient,
    mailer: Option<&Mailer>,
    today: NaiveDate,
) -> Result<ChangeReport, SyncError> {
    let (path, staged) = stage_yesterday(source, &config.staging_dir, today).await?;
    tracing::info!(path = %path.display(), staged, "staging complete");

    run_sync(
        config,
        shopify,
        mailer,
        SyncOptions {
            date: today,
            dry_run: false,
        },
    )
    .await
}
