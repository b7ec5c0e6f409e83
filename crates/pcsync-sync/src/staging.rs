//! Daily CSV snapshot of changed source products.
//!
//! One file per run day, named `DD_MM_YYYY.csv`, holding the products the
//! source reported as changed during the previous calendar day.

use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use pcsync_core::{StagedProduct, NOT_AVAILABLE};
use pcsync_source::{DateRange, SourceClient, SourceProduct};
use serde_json::{Map, Number, Value};

use crate::error::SyncError;

const SNAPSHOT_DATE_FORMAT: &str = "%d_%m_%Y";
const UNCATEGORIZED: &str = "Uncategorized";

/// `dir/DD_MM_YYYY.csv`
#[must_use]
pub fn snapshot_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}.csv", date.format(SNAPSHOT_DATE_FORMAT)))
}

/// Parses a `DD_MM_YYYY` snapshot date; anything else is rejected.
#[must_use]
pub fn parse_snapshot_date(raw: &str) -> Option<NaiveDate> {
    let bytes = raw.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes[2] == b'_'
        && bytes[5] == b'_'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 2 || i == 5 || b.is_ascii_digit());
    if !well_formed {
        return None;
    }
    NaiveDate::parse_from_str(raw, SNAPSHOT_DATE_FORMAT).ok()
}

/// Collapses line breaks to spaces and trims; empty or missing becomes `N/A`.
fn clean_text(value: Option<&str>) -> String {
    let cleaned = value
        .unwrap_or_default()
        .replace(['\r', '\n'], " ")
        .trim()
        .to_owned();
    if cleaned.is_empty() {
        NOT_AVAILABLE.to_owned()
    } else {
        cleaned
    }
}

/// Converts one source product to a CSV row, or `None` when the row would
/// carry nothing worth syncing: stock is the only reported change and more
/// than one unit remains.
fn stage_product(product: &SourceProduct) -> Option<StagedProduct> {
    let stock = product.stock();
    if product.only_stock_changed() && stock > 1 {
        tracing::debug!(product_id = product.id, stock, "skipping stock-only change");
        return None;
    }

    let category = product
        .category_path()
        .unwrap_or_else(|| UNCATEGORIZED.to_owned());

    Some(StagedProduct {
        id: product.id.to_string(),
        sku: clean_text(product.sku.as_deref()),
        title: clean_text(Some(&product.title)),
        brand: clean_text(product.brand()),
        stock,
        currency: clean_text(Some(&product.price.currency)),
        price: product.price.price,
        changes: product.extra_data.changes.join(","),
        barcode: clean_text(product.barcode()),
        category: clean_text(Some(&category)),
        description: clean_text(product.description.as_deref()),
        body: clean_text(product.body.as_deref()),
        image_urls: product.image_urls().join(", "),
    })
}

/// Converts source products to snapshot rows, dropping stock-only changes
/// with more than one unit in stock.
#[must_use]
pub fn stage_products(products: &[SourceProduct]) -> Vec<StagedProduct> {
    products.iter().filter_map(stage_product).collect()
}

/// Writes `rows` to `path`, replacing any existing file.
///
/// # Errors
///
/// [`SyncError::Io`] if the directory cannot be created, [`SyncError::Csv`]
/// on write failure.
pub fn write_snapshot(path: &Path, rows: &[StagedProduct]) -> Result<(), SyncError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| SyncError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let csv_err = |source| SyncError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    if rows.is_empty() {
        writer.write_record(HEADER).map_err(csv_err)?;
    }
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| SyncError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(path = %path.display(), rows = rows.len(), "wrote staged snapshot");
    Ok(())
}

const HEADER: [&str; 13] = [
    "ID",
    "SKU",
    "Title",
    "Brand",
    "Stock",
    "Currency",
    "Price",
    "Changes",
    "Barcode",
    "Category",
    "Description",
    "Body",
    "Image_URLs",
];

/// Loads a snapshot sorted by numeric source id. Rows that fail to parse
/// are logged and skipped.
///
/// # Errors
///
/// [`SyncError::SnapshotMissing`] when the file does not exist,
/// [`SyncError::Csv`] when it cannot be opened.
pub fn read_snapshot(path: &Path) -> Result<Vec<StagedProduct>, SyncError> {
    let mut reader = open_reader(path)?;

    let mut rows: Vec<StagedProduct> = Vec::new();
    for (index, record) in reader.deserialize::<StagedProduct>().enumerate() {
        match record {
            Ok(row) => rows.push(row),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    line = index + 2,
                    error = %e,
                    "skipping malformed snapshot row"
                );
            }
        }
    }
    rows.sort_by_key(StagedProduct::sort_key);

    tracing::info!(path = %path.display(), rows = rows.len(), "read staged snapshot");
    Ok(rows)
}

/// Loads a snapshot as JSON objects keyed by column header.
///
/// `ID` and `Stock` cells that parse as integers and `Price` cells that parse
/// as decimals become JSON numbers. Every other cell is a string, with empty
/// cells as `""`.
///
/// # Errors
///
/// Same as [`read_snapshot`]; a malformed record also fails with
/// [`SyncError::Csv`].
pub fn read_snapshot_records(path: &Path) -> Result<Vec<Map<String, Value>>, SyncError> {
    let mut reader = open_reader(path)?;
    let csv_err = |source| SyncError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let headers = reader.headers().map_err(csv_err)?.clone();
    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let object = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let cell = record.get(i).unwrap_or_default();
                (header.to_owned(), record_cell(header, cell))
            })
            .collect();
        records.push(object);
    }
    Ok(records)
}

fn record_cell(header: &str, cell: &str) -> Value {
    let number = match header {
        "ID" | "Stock" => cell.trim().parse::<i64>().ok().map(Number::from),
        "Price" => cell.trim().parse::<f64>().ok().and_then(Number::from_f64),
        _ => None,
    };
    number.map_or_else(|| Value::String(cell.to_owned()), Value::Number)
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>, SyncError> {
    if !path.exists() {
        return Err(SyncError::SnapshotMissing {
            path: path.to_path_buf(),
        });
    }
    csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|source| SyncError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

/// Fetches everything the source changed on the day before `today` and
/// writes it to today's snapshot. Returns the snapshot path and row count.
///
/// # Errors
///
/// Source API failures and snapshot write failures.
pub async fn stage_yesterday(
    source: &SourceClient,
    dir: &Path,
    today: NaiveDate,
) -> Result<(PathBuf, usize), SyncError> {
    let yesterday = today.checked_sub_days(Days::new(1)).unwrap_or(today);
    let range = DateRange::whole_day(yesterday);
    tracing::info!(range = %range, "staging products changed yesterday");

    let products = source.products_by_date(range).await?;
    let rows = stage_products(&products);
    tracing::info!(
        fetched = products.len(),
        staged = rows.len(),
        "filtered changed products"
    );

    let path = snapshot_path(dir, today);
    write_snapshot(&path, &rows)?;
    Ok((path, rows.len()))
}

#[cfg(test)]
#[path = "staging_test.rs"]
mod tests;
