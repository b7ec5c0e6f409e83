use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::gid::numeric_id;

/// Publication status of a product.
///
/// REST speaks lowercase (`draft`), GraphQL uppercase (`DRAFT`); both parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductStatus {
    #[serde(rename = "active", alias = "ACTIVE")]
    Active,
    #[serde(rename = "draft", alias = "DRAFT")]
    Draft,
    #[serde(rename = "archived", alias = "ARCHIVED")]
    Archived,
}

impl ProductStatus {
    /// Case-insensitive parse; unknown statuses yield `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Some(Self::Active),
            "draft" => Some(Self::Draft),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductStatus::Active => write!(f, "active"),
            ProductStatus::Draft => write!(f, "draft"),
            ProductStatus::Archived => write!(f, "archived"),
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog (GraphQL read side)
// ---------------------------------------------------------------------------

/// A storefront product as read from the GraphQL catalog query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogProduct {
    /// Global id, `gid://shopify/Product/{n}`.
    pub id: String,
    pub title: String,
    pub status: Option<ProductStatus>,
    pub variants: Vec<CatalogVariant>,
    /// `custom` namespace metafields as `(key, value)` pairs.
    pub metafields: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogVariant {
    pub id: String,
    pub title: Option<String>,
    pub price: Decimal,
    /// `None` when Shopify does not track inventory for the variant.
    pub inventory_quantity: Option<i64>,
    pub inventory_item_id: Option<String>,
}

impl CatalogProduct {
    #[must_use]
    pub fn metafield(&self, key: &str) -> Option<&str> {
        self.metafields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Source product id stored in `custom.pc_service_id`.
    #[must_use]
    pub fn pc_service_id(&self) -> Option<u64> {
        self.metafield("pc_service_id")
            .and_then(|v| v.trim().parse().ok())
    }

    #[must_use]
    pub fn product_id(&self) -> Option<u64> {
        numeric_id(&self.id)
    }
}

// ---------------------------------------------------------------------------
// REST write side
// ---------------------------------------------------------------------------

/// Payload for `POST products.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProduct {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    /// Comma-separated tag list.
    pub tags: String,
    pub status: ProductStatus,
    pub variants: Vec<NewVariant>,
    pub images: Vec<NewImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewVariant {
    pub price: Decimal,
    pub cost: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    pub inventory_management: String,
    pub inventory_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewImage {
    pub src: String,
}

/// Partial product update for `PUT products/{id}.json`; absent fields are
/// left untouched by Shopify.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductUpdate {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<VariantUpdate>,
}

impl ProductUpdate {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self {
            id,
            title: None,
            status: None,
            variants: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantUpdate {
    pub id: u64,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<Decimal>,
}

/// The parts of a `products.json` create response the sync needs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedProduct {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub variants: Vec<CreatedVariant>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedVariant {
    pub id: u64,
    #[serde(default)]
    pub inventory_item_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_accepts_both_casings() {
        let rest: ProductStatus = serde_json::from_str("\"draft\"").unwrap();
        let graphql: ProductStatus = serde_json::from_str("\"DRAFT\"").unwrap();
        assert_eq!(rest, ProductStatus::Draft);
        assert_eq!(graphql, ProductStatus::Draft);
        assert_eq!(
            serde_json::to_string(&ProductStatus::Draft).unwrap(),
            "\"draft\""
        );
        assert_eq!(ProductStatus::parse("Active"), Some(ProductStatus::Active));
        assert_eq!(ProductStatus::parse("UNLISTED"), None);
    }

    #[test]
    fn product_update_omits_unset_fields() {
        let mut update = ProductUpdate::new(10);
        update.status = Some(ProductStatus::Draft);
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({ "id": 10, "status": "draft" }));
    }

    #[test]
    fn variant_update_serializes_money_as_strings() {
        let update = VariantUpdate {
            id: 5,
            price: Decimal::new(6197, 2),
            cost: Some(Decimal::new(4590, 2)),
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "id": 5, "price": "61.97", "cost": "45.90" })
        );
    }

    #[test]
    fn catalog_product_reads_pc_service_id() {
        let product = CatalogProduct {
            id: "gid://shopify/Product/77".to_owned(),
            title: "Mouse".to_owned(),
            status: Some(ProductStatus::Active),
            variants: Vec::new(),
            metafields: vec![
                ("proveedor".to_owned(), "PC Service".to_owned()),
                ("pc_service_id".to_owned(), "55155".to_owned()),
            ],
        };
        assert_eq!(product.pc_service_id(), Some(55155));
        assert_eq!(product.product_id(), Some(77));
        assert_eq!(product.metafield("proveedor"), Some("PC Service"));
    }
}
