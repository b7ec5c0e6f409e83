//! Daily PC Service → Shopify synchronisation: staging the source delta to
//! CSV, reconciling it against the live catalog, and reporting the outcome.

pub mod error;
pub mod mail;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod staging;

pub use error::SyncError;
pub use mail::{deliver_report, EmailError, Mailer};
pub use pipeline::{build_shopify_client, build_source_client, run_daily, run_sync, SyncOptions};
pub use reconcile::{apply, index_catalog, plan, ApplyOptions, FieldChange, Listing, PlannedAction};
pub use report::{ChangeReport, Outcome, ReportEntry};
pub use staging::{
    parse_snapshot_date, read_snapshot, read_snapshot_records, snapshot_path, stage_products,
    stage_yesterday, write_snapshot,
};
