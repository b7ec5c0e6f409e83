//! Diff the staged snapshot against the live catalog and push the result.
//!
//! Listings are matched to snapshot rows through the `custom.pc_service_id`
//! metafield. Each row becomes exactly one [`PlannedAction`]; [`apply`] runs
//! them in order and records every outcome in a [`ChangeReport`].

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use pcsync_core::{apply_margin, StagedProduct};
use pcsync_shopify::{
    numeric_id, CatalogProduct, NewImage, NewProduct, NewVariant, ProductStatus, ProductUpdate,
    ShopifyClient, ShopifyError, VariantUpdate,
};
use rust_decimal::Decimal;

use crate::report::{ChangeReport, ReportEntry};

/// What the sync knows about a storefront product, taken from its first
/// variant.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub product_id: u64,
    pub variant_id: u64,
    pub inventory_item_id: Option<u64>,
    pub title: String,
    pub price: Decimal,
    pub stock: i64,
    pub status: Option<ProductStatus>,
}

/// Indexes listings by source product id. Products without the metafield,
/// without variants, or with unusable ids are skipped; on duplicates the
/// first listing wins.
#[must_use]
pub fn index_catalog(products: &[CatalogProduct]) -> HashMap<u64, Listing> {
    let mut index: HashMap<u64, Listing> = HashMap::new();

    for product in products {
        let Some(source_id) = product.pc_service_id() else {
            continue;
        };
        let Some(variant) = product.variants.first() else {
            tracing::warn!(product = %product.id, source_id, "listing has no variants; ignoring");
            continue;
        };
        let (Some(product_id), Some(variant_id)) =
            (product.product_id(), numeric_id(&variant.id))
        else {
            tracing::warn!(
                product = %product.id,
                variant = %variant.id,
                "unparseable Shopify ids; ignoring"
            );
            continue;
        };

        if let Some(existing) = index.get(&source_id) {
            tracing::warn!(
                source_id,
                kept = existing.product_id,
                ignored = product_id,
                "several listings share a pc_service_id; keeping the first"
            );
            continue;
        }

        index.insert(
            source_id,
            Listing {
                product_id,
                variant_id,
                inventory_item_id: variant.inventory_item_id.as_deref().and_then(numeric_id),
                title: product.title.clone(),
                price: variant.price,
                stock: variant.inventory_quantity.unwrap_or(0),
                status: product.status,
            },
        );
    }

    index
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    Price { from: Decimal, to: Decimal },
    Stock { from: i64, to: i64 },
    Title { from: String, to: String },
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldChange::Price { from, to } => write!(f, "Price: {from} → {to}"),
            FieldChange::Stock { from, to } => write!(f, "Stock: {from} → {to}"),
            FieldChange::Title { from, to } => write!(f, "Title: {from} → {to}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlannedAction {
    /// Not listed yet: create as a draft with the margin price.
    Create {
        source_id: u64,
        row: StagedProduct,
        price: Decimal,
    },
    /// Listed and in stock, with at least one field out of date.
    Update {
        source_id: u64,
        row: StagedProduct,
        listing: Listing,
        price: Decimal,
        changes: Vec<FieldChange>,
    },
    /// Listed but sold out at the source: draft status and zero inventory.
    Pause { source_id: u64, listing: Listing },
    Unchanged {
        source_id: u64,
        title: String,
    },
    Skip {
        id: String,
        reason: &'static str,
    },
}

impl PlannedAction {
    /// Source id as written in the snapshot.
    #[must_use]
    pub fn source_label(&self) -> String {
        match self {
            PlannedAction::Create { source_id, .. }
            | PlannedAction::Update { source_id, .. }
            | PlannedAction::Pause { source_id, .. }
            | PlannedAction::Unchanged { source_id, .. } => source_id.to_string(),
            PlannedAction::Skip { id, .. } => id.clone(),
        }
    }
}

/// Decides one action per snapshot row, in row order.
#[must_use]
pub fn plan(
    rows: &[StagedProduct],
    index: &HashMap<u64, Listing>,
    margin: Decimal,
    create_missing: bool,
) -> Vec<PlannedAction> {
    rows.iter()
        .map(|row| plan_row(row, index, margin, create_missing))
        .collect()
}

fn plan_row(
    row: &StagedProduct,
    index: &HashMap<u64, Listing>,
    margin: Decimal,
    create_missing: bool,
) -> PlannedAction {
    let Some(source_id) = row.source_id() else {
        return PlannedAction::Skip {
            id: row.id.clone(),
            reason: "non-numeric source id",
        };
    };
    let price = apply_margin(row.price, margin);

    match index.get(&source_id) {
        Some(listing) if row.is_out_of_stock() => {
            if listing.status == Some(ProductStatus::Draft) && listing.stock == 0 {
                PlannedAction::Unchanged {
                    source_id,
                    title: listing.title.clone(),
                }
            } else {
                PlannedAction::Pause {
                    source_id,
                    listing: listing.clone(),
                }
            }
        }
        Some(listing) => {
            let changes = detect_changes(row, listing, price);
            if changes.is_empty() {
                PlannedAction::Unchanged {
                    source_id,
                    title: listing.title.clone(),
                }
            } else {
                PlannedAction::Update {
                    source_id,
                    row: row.clone(),
                    listing: listing.clone(),
                    price,
                    changes,
                }
            }
        }
        None if row.is_out_of_stock() => PlannedAction::Skip {
            id: row.id.clone(),
            reason: "not listed and out of stock",
        },
        None if !create_missing => PlannedAction::Skip {
            id: row.id.clone(),
            reason: "not listed and creation disabled",
        },
        None => PlannedAction::Create {
            source_id,
            row: row.clone(),
            price,
        },
    }
}

fn detect_changes(row: &StagedProduct, listing: &Listing, price: Decimal) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    if listing.price != price {
        changes.push(FieldChange::Price {
            from: listing.price,
            to: price,
        });
    }
    if listing.stock != row.stock {
        changes.push(FieldChange::Stock {
            from: listing.stock,
            to: row.stock,
        });
    }
    if let Some(title) = row_title(row) {
        if title != listing.title.trim() {
            changes.push(FieldChange::Title {
                from: listing.title.clone(),
                to: title.to_owned(),
            });
        }
    }

    changes
}

fn row_title(row: &StagedProduct) -> Option<&str> {
    let title = row.title.trim();
    (!title.is_empty() && title != pcsync_core::NOT_AVAILABLE).then_some(title)
}

/// Settings for [`apply`].
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    pub location_id: u64,
    /// Pause between consecutive actions that write to Shopify.
    pub request_delay: Duration,
    pub supplier_name: String,
    /// Report what would change without writing anything.
    pub dry_run: bool,
}

/// Runs `actions` in order. A failing action is recorded and the run
/// continues with the next one.
pub async fn apply(
    actions: Vec<PlannedAction>,
    shopify: &ShopifyClient,
    options: &ApplyOptions,
) -> ChangeReport {
    let mut report = ChangeReport {
        dry_run: options.dry_run,
        ..ChangeReport::default()
    };
    let mut wrote_before = false;

    for action in actions {
        let label = action.source_label();
        match action {
            PlannedAction::Unchanged { .. } => report.unchanged += 1,
            PlannedAction::Skip { id, reason } => {
                tracing::debug!(source_id = %id, reason, "skipping snapshot row");
                report.skipped += 1;
            }
            PlannedAction::Create {
                source_id,
                row,
                price,
            } => {
                let title = row.title.clone();
                let detail = format!("Price: {price}, Stock: {}", row.stock);
                if options.dry_run {
                    report.created.push(ReportEntry::new(&label, &title, detail));
                    continue;
                }
                pace(&mut wrote_before, options.request_delay).await;
                let created =
                    create_listing(shopify, source_id, &row, price, &options.supplier_name).await;
                match created {
                    Ok(product_id) => {
                        tracing::info!(source_id, product_id, "created listing");
                        report.created.push(ReportEntry::new(&label, &title, detail));
                    }
                    Err(e) => {
                        tracing::error!(source_id, error = %e, "failed to create listing");
                        let detail = format!("create failed: {e}");
                        report.failed.push(ReportEntry::new(&label, &title, detail));
                    }
                }
            }
            PlannedAction::Update {
                source_id,
                row,
                listing,
                price,
                changes,
            } => {
                let detail = changes
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                if options.dry_run {
                    report.updated.push(ReportEntry::new(&label, &listing.title, detail));
                    continue;
                }
                pace(&mut wrote_before, options.request_delay).await;
                let updated =
                    update_listing(shopify, &listing, &row, price, &changes, options.location_id)
                        .await;
                match updated {
                    Ok(()) => {
                        tracing::info!(
                            source_id,
                            product_id = listing.product_id,
                            changes = %detail,
                            "updated listing"
                        );
                        report.updated.push(ReportEntry::new(&label, &listing.title, detail));
                    }
                    Err(e) => {
                        tracing::error!(
                            source_id,
                            product_id = listing.product_id,
                            error = %e,
                            "failed to update listing"
                        );
                        let detail = format!("update failed: {e}");
                        report.failed.push(ReportEntry::new(&label, &listing.title, detail));
                    }
                }
            }
            PlannedAction::Pause { source_id, listing } => {
                let detail = "Stock 0: status draft".to_owned();
                if options.dry_run {
                    report.paused.push(ReportEntry::new(&label, &listing.title, detail));
                    continue;
                }
                pace(&mut wrote_before, options.request_delay).await;
                match pause_listing(shopify, &listing, options.location_id).await {
                    Ok(()) => {
                        tracing::info!(
                            source_id,
                            product_id = listing.product_id,
                            "paused listing"
                        );
                        report.paused.push(ReportEntry::new(&label, &listing.title, detail));
                    }
                    Err(e) => {
                        tracing::error!(
                            source_id,
                            product_id = listing.product_id,
                            error = %e,
                            "failed to pause listing"
                        );
                        let detail = format!("pause failed: {e}");
                        report.failed.push(ReportEntry::new(&label, &listing.title, detail));
                    }
                }
            }
        }
    }

    report
}

async fn pace(wrote_before: &mut bool, delay: Duration) {
    if *wrote_before && !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    *wrote_before = true;
}

fn missing_inventory_item(listing: &Listing) -> ShopifyError {
    ShopifyError::UnexpectedShape {
        context: format!(
            "product {} has no inventory item on its first variant",
            listing.product_id
        ),
    }
}

async fn update_listing(
    shopify: &ShopifyClient,
    listing: &Listing,
    row: &StagedProduct,
    price: Decimal,
    changes: &[FieldChange],
    location_id: u64,
) -> Result<(), ShopifyError> {
    let mut stock_target = None;
    let mut update = ProductUpdate::new(listing.product_id);
    let mut touches_product = false;

    for change in changes {
        match change {
            FieldChange::Price { .. } => touches_product = true,
            FieldChange::Title { to, .. } => {
                update.title = Some(to.clone());
                touches_product = true;
            }
            FieldChange::Stock { to, .. } => stock_target = Some(*to),
        }
    }

    if touches_product {
        update.variants.push(VariantUpdate {
            id: listing.variant_id,
            price,
            cost: Some(row.price),
        });
        shopify.update_product(&update).await?;
    }

    if let Some(available) = stock_target {
        let item = listing
            .inventory_item_id
            .ok_or_else(|| missing_inventory_item(listing))?;
        shopify.set_inventory(item, location_id, available).await?;
    }
    Ok(())
}

async fn pause_listing(
    shopify: &ShopifyClient,
    listing: &Listing,
    location_id: u64,
) -> Result<(), ShopifyError> {
    shopify
        .set_status(listing.product_id, ProductStatus::Draft)
        .await?;
    let item = listing
        .inventory_item_id
        .ok_or_else(|| missing_inventory_item(listing))?;
    shopify.set_inventory(item, location_id, 0).await
}

/// Draft product payload for a snapshot row.
#[must_use]
pub fn new_product_from_row(row: &StagedProduct, price: Decimal) -> NewProduct {
    NewProduct {
        title: row.title.clone(),
        body_html: row.body_html().map(ToOwned::to_owned),
        vendor: row.brand().map(ToOwned::to_owned),
        product_type: None,
        tags: row.tags().join(", "),
        status: ProductStatus::Draft,
        variants: vec![NewVariant {
            price,
            cost: row.price,
            sku: row.sku().map(ToOwned::to_owned),
            barcode: row.barcode().map(ToOwned::to_owned),
            inventory_management: "shopify".to_owned(),
            inventory_quantity: row.stock,
        }],
        images: row
            .image_url_list()
            .into_iter()
            .map(|src| NewImage { src })
            .collect(),
    }
}

async fn create_listing(
    shopify: &ShopifyClient,
    source_id: u64,
    row: &StagedProduct,
    price: Decimal,
    supplier: &str,
) -> Result<u64, ShopifyError> {
    let created = shopify
        .create_product(&new_product_from_row(row, price))
        .await?;
    shopify
        .assign_source_metafields(created.id, source_id, supplier)
        .await?;
    Ok(created.id)
}

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod tests;
