use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Placeholder written for text columns the source left empty.
pub const NOT_AVAILABLE: &str = "N/A";

/// One row of the daily staging CSV: a source product that changed during
/// the previous day.
///
/// Column names match the header the admin frontend reads
/// (`ID,SKU,Title,Brand,Stock,Currency,Price,Changes,Barcode,Category,Description,Body,Image_URLs`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedProduct {
    /// PC Service product id. Kept as text because the file is hand-editable.
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "SKU")]
    pub sku: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Stock")]
    pub stock: i64,
    #[serde(rename = "Currency")]
    pub currency: String,
    /// Source cost, before margin.
    #[serde(rename = "Price", with = "rust_decimal::serde::str")]
    pub price: Decimal,
    /// Comma-separated change markers reported by the source (`stock`, `price`, ...).
    #[serde(rename = "Changes")]
    pub changes: String,
    #[serde(rename = "Barcode")]
    pub barcode: String,
    /// Category path, `Parent > Child`.
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Body")]
    pub body: String,
    /// Image URLs joined by `", "`.
    #[serde(rename = "Image_URLs")]
    pub image_urls: String,
}

impl StagedProduct {
    /// Numeric source id, or `None` when the `ID` cell is not a number.
    #[must_use]
    pub fn source_id(&self) -> Option<u64> {
        self.id.trim().parse().ok()
    }

    /// Sort key used when loading a snapshot; non-numeric ids sort first.
    #[must_use]
    pub fn sort_key(&self) -> u64 {
        self.source_id().unwrap_or(0)
    }

    #[must_use]
    pub fn is_out_of_stock(&self) -> bool {
        self.stock <= 0
    }

    /// Individual image URLs, with any stray quoting removed.
    #[must_use]
    pub fn image_url_list(&self) -> Vec<String> {
        self.image_urls
            .split(',')
            .map(|url| url.trim().trim_matches(|c| c == '"' || c == '\''))
            .filter(|url| !url.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    }

    /// Storefront tags: each category level followed by the brand.
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        category_tags(&self.category, present(&self.brand))
    }

    /// Product body: the rich `Body` column, falling back to `Description`.
    #[must_use]
    pub fn body_html(&self) -> Option<&str> {
        present(&self.body).or_else(|| present(&self.description))
    }

    #[must_use]
    pub fn sku(&self) -> Option<&str> {
        present(&self.sku)
    }

    #[must_use]
    pub fn barcode(&self) -> Option<&str> {
        present(&self.barcode)
    }

    #[must_use]
    pub fn brand(&self) -> Option<&str> {
        present(&self.brand)
    }
}

/// Split a `Parent > Child` category path into tags and append the vendor.
///
/// Quotes are dropped and embedded commas become dots, since Shopify treats
/// commas as tag separators.
#[must_use]
pub fn category_tags(category_path: &str, vendor: Option<&str>) -> Vec<String> {
    let mut tags: Vec<String> = category_path
        .split('>')
        .map(|part| part.trim().replace('"', "").replace(',', "."))
        .filter(|part| !part.is_empty() && part != NOT_AVAILABLE)
        .collect();

    if let Some(vendor) = vendor.map(str::trim).filter(|v| !v.is_empty()) {
        tags.push(vendor.to_owned());
    }
    tags
}

fn present(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == NOT_AVAILABLE {
        None
    } else {
        Some(trimmed)
    }
}
