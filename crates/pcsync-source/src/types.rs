//! Response types for the PC Service product API.
//!
//! Only the fields the sync reads are modelled. Optional fields tolerate both
//! absence and explicit `null`.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// A product as returned by `products/{id}` and `products/bydate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceProduct {
    pub id: u64,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, rename = "type")]
    pub product_type: Option<String>,
    /// Free-form tag path (`Parent > Child`); filled by callers that know
    /// the storefront category.
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub availability: Availability,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: SourcePrice,
    #[serde(default, rename = "extraData", deserialize_with = "null_as_default")]
    pub extra_data: ExtraData,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<SourceCategory>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<SourceImage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Availability {
    #[serde(default, deserialize_with = "null_as_default")]
    pub stock: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcePrice {
    /// Supplier cost.
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: Decimal,
    #[serde(default, deserialize_with = "null_as_default")]
    pub currency: String,
    #[serde(default)]
    pub sku: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtraData {
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    /// Fields the source reports as changed, e.g. `["stock", "price"]`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub changes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCategory {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub childs: Vec<SourceCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceImage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub variations: Vec<ImageVariation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageVariation {
    pub url: String,
    #[serde(default)]
    pub size: Option<String>,
}

impl SourceProduct {
    #[must_use]
    pub fn stock(&self) -> i64 {
        self.availability.stock
    }

    #[must_use]
    pub fn brand(&self) -> Option<&str> {
        non_blank(self.extra_data.brand.as_deref())
    }

    #[must_use]
    pub fn barcode(&self) -> Option<&str> {
        non_blank(self.extra_data.barcode.as_deref())
    }

    /// SKU carried on the price record, which is what the storefront variant uses.
    #[must_use]
    pub fn variant_sku(&self) -> Option<&str> {
        non_blank(self.price.sku.as_deref()).or_else(|| non_blank(self.sku.as_deref()))
    }

    /// `true` when the source reports stock as the only change.
    #[must_use]
    pub fn only_stock_changed(&self) -> bool {
        matches!(self.extra_data.changes.as_slice(), [only] if only == "stock")
    }

    /// First category and its direct children, joined with `" > "`.
    #[must_use]
    pub fn category_path(&self) -> Option<String> {
        let first = self.categories.first()?;
        let path = std::iter::once(first.title.as_str())
            .chain(first.childs.iter().map(|c| c.title.as_str()))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" > ");
        (!path.is_empty()).then_some(path)
    }

    /// Every image variation URL, in response order.
    #[must_use]
    pub fn image_urls(&self) -> Vec<&str> {
        self.images
            .iter()
            .flat_map(|image| image.variations.iter())
            .map(|v| v.url.trim())
            .filter(|url| !url.is_empty())
            .collect()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
