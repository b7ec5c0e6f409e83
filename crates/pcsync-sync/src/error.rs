use std::path::PathBuf;

use pcsync_shopify::ShopifyError;
use pcsync_source::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("source API error: {0}")]
    Source(#[from] SourceError),

    #[error("Shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    #[error("staged snapshot not found: {}", path.display())]
    SnapshotMissing { path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}
