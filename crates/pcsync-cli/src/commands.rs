//! Command handlers, called from `main` once config and tracing are set up.

use anyhow::Context;
use chrono::{Local, NaiveDate};
use pcsync_core::AppConfig;
use pcsync_sync::{
    build_shopify_client, build_source_client, parse_snapshot_date, stage_yesterday, ChangeReport,
    Mailer, Outcome, SyncOptions,
};

/// Resolves a `--date` argument, defaulting to today's local date.
pub(crate) fn resolve_date(raw: Option<&str>) -> anyhow::Result<NaiveDate> {
    match raw {
        Some(raw) => parse_snapshot_date(raw)
            .with_context(|| format!("invalid date '{raw}', expected DD_MM_YYYY")),
        None => Ok(Local::now().date_naive()),
    }
}

fn build_mailer(config: &AppConfig) -> anyhow::Result<Option<Mailer>> {
    config
        .mail
        .as_ref()
        .map(Mailer::new)
        .transpose()
        .context("failed to configure report mailer")
}

fn print_summary(report: &ChangeReport) {
    println!("{}", report.subject());
    println!(
        "created {}, updated {}, paused {}, failed {}, unchanged {}, skipped {}",
        report.created.len(),
        report.updated.len(),
        report.paused.len(),
        report.failed.len(),
        report.unchanged,
        report.skipped
    );
    for entry in &report.failed {
        eprintln!("  {} {}: {}", entry.source_id, entry.title, entry.detail);
    }
}

/// Exit with an error when every attempted change failed, so cron wrappers
/// notice.
fn check_outcome(report: &ChangeReport) -> anyhow::Result<()> {
    if report.outcome() == Outcome::TotalFailure {
        anyhow::bail!("all {} changes failed", report.failed.len());
    }
    Ok(())
}

pub(crate) async fn run_stage(config: &AppConfig, date: Option<&str>) -> anyhow::Result<()> {
    let today = resolve_date(date)?;
    let source = build_source_client(config)?;
    let (path, staged) = stage_yesterday(&source, &config.staging_dir, today).await?;
    println!("staged {staged} products to {}", path.display());
    Ok(())
}

pub(crate) async fn run_sync(
    config: &AppConfig,
    date: Option<&str>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let date = resolve_date(date)?;
    let shopify = build_shopify_client(config)?;
    let mailer = if dry_run { None } else { build_mailer(config)? };

    let report =
        pcsync_sync::run_sync(config, &shopify, mailer.as_ref(), SyncOptions { date, dry_run })
            .await?;

    if dry_run {
        println!("{}", report.render_text()?);
    } else {
        print_summary(&report);
    }
    check_outcome(&report)
}

pub(crate) async fn run_daily(config: &AppConfig) -> anyhow::Result<()> {
    let today = Local::now().date_naive();
    let source = build_source_client(config)?;
    let shopify = build_shopify_client(config)?;
    let mailer = build_mailer(config)?;

    let report =
        pcsync_sync::run_daily(config, &source, &shopify, mailer.as_ref(), today).await?;
    print_summary(&report);
    check_outcome(&report)
}

pub(crate) async fn run_locations(config: &AppConfig) -> anyhow::Result<()> {
    let shopify = build_shopify_client(config)?;
    let locations = shopify.locations().await?;
    if locations.is_empty() {
        println!("no locations");
        return Ok(());
    }

    println!("{:<16}{:<8}NAME", "ID", "ACTIVE");
    for location in locations {
        let active = match location.active {
            Some(true) => "yes",
            Some(false) => "no",
            None => "?",
        };
        println!("{:<16}{:<8}{}", location.id, active, location.name);
    }
    Ok(())
}
