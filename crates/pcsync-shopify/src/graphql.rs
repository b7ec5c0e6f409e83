//! Catalog read through the Admin GraphQL API.
//!
//! Products are paged 250 at a time via `pageInfo { hasNextPage endCursor }`.
//! Only the first 10 variants and the first 10 `custom` metafields of each
//! product are requested; the sync only looks at the first variant.

use std::time::Duration;

use reqwest::Method;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::ShopifyClient;
use crate::error::ShopifyError;
use crate::rate_limit::RetryPolicy;
use crate::types::{CatalogProduct, CatalogVariant, ProductStatus};

/// Maximum number of pages to fetch before returning an error.
/// Prevents infinite loops on cycling cursors.
const MAX_PAGES: usize = 400;

pub const CATALOG_QUERY: &str = r#"
query ($after: String) {
  products(first: 250, after: $after) {
    pageInfo {
      hasNextPage
      endCursor
    }
    edges {
      cursor
      node {
        id
        title
        status
        variants(first: 10) {
          edges {
            node {
              id
              title
              price
              inventoryQuantity
              inventoryItem {
                id
              }
            }
          }
        }
        metafields(namespace: "custom", first: 10) {
          edges {
            node {
              key
              value
            }
          }
        }
      }
    }
  }
}
"#;

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<CatalogData>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Deserialize)]
struct GraphQlErrorEntry {
    message: String,
    #[serde(default)]
    extensions: Option<Value>,
}

#[derive(Deserialize)]
struct CatalogData {
    products: Option<ProductConnection>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductConnection {
    page_info: PageInfo,
    #[serde(default)]
    edges: Vec<Edge<ProductNode>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    #[serde(default)]
    end_cursor: Option<String>,
}

#[derive(Deserialize)]
struct Connection<T> {
    #[serde(default = "Vec::new")]
    edges: Vec<Edge<T>>,
}

#[derive(Deserialize)]
struct Edge<T> {
    #[serde(default)]
    cursor: Option<String>,
    node: T,
}

#[derive(Deserialize)]
struct ProductNode {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    status: Option<String>,
    variants: Option<Connection<VariantNode>>,
    metafields: Option<Connection<MetafieldNode>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariantNode {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default)]
    inventory_quantity: Option<i64>,
    #[serde(default)]
    inventory_item: Option<IdNode>,
}

#[derive(Deserialize)]
struct IdNode {
    id: String,
}

#[derive(Deserialize)]
struct MetafieldNode {
    key: String,
    #[serde(default)]
    value: Option<String>,
}

impl From<ProductNode> for CatalogProduct {
    fn from(node: ProductNode) -> Self {
        let variants = node
            .variants
            .map(|c| c.edges)
            .unwrap_or_default()
            .into_iter()
            .map(|edge| {
                let v = edge.node;
                CatalogVariant {
                    id: v.id,
                    title: v.title,
                    price: v.price.unwrap_or(Decimal::ZERO),
                    inventory_quantity: v.inventory_quantity,
                    inventory_item_id: v.inventory_item.map(|i| i.id),
                }
            })
            .collect();
        let metafields = node
            .metafields
            .map(|c| c.edges)
            .unwrap_or_default()
            .into_iter()
            .map(|edge| (edge.node.key, edge.node.value.unwrap_or_default()))
            .collect();

        CatalogProduct {
            id: node.id,
            title: node.title,
            status: node.status.as_deref().and_then(ProductStatus::parse),
            variants,
            metafields,
        }
    }
}

/// One page of the catalog and the cursor for the next page, if any.
pub struct CatalogPage {
    pub products: Vec<CatalogProduct>,
    pub next_cursor: Option<String>,
}

impl ShopifyClient {
    /// Fetches one catalog page starting after `after`.
    ///
    /// # Errors
    ///
    /// - [`ShopifyError::RateLimited`] for HTTP 429 or a `THROTTLED`
    ///   GraphQL error, after retries are exhausted.
    /// - [`ShopifyError::GraphQl`] for any other GraphQL error.
    /// - [`ShopifyError::UnexpectedShape`] when `data.products` is missing.
    /// - Transport, status and deserialization errors.
    pub async fn fetch_catalog_page(
        &self,
        after: Option<&str>,
    ) -> Result<CatalogPage, ShopifyError> {
        let url = self.endpoint("graphql.json")?;
        let body = json!({ "query": CATALOG_QUERY, "variables": { "after": after } });

        self.with_retry(RetryPolicy::Transient, || async {
            let raw = self.send_once(Method::POST, &url, Some(&body)).await?;
            parse_catalog_page(raw)
        })
        .await
    }

    /// Fetches the whole catalog by following cursors until `hasNextPage` is
    /// false.
    ///
    /// `inter_request_delay_ms` is slept between page requests (not before
    /// the first).
    ///
    /// # Errors
    ///
    /// Propagates any error from [`Self::fetch_catalog_page`].
    /// Returns [`ShopifyError::PaginationLimit`] past [`MAX_PAGES`] pages.
    pub async fn fetch_catalog(
        &self,
        inter_request_delay_ms: u64,
    ) -> Result<Vec<CatalogProduct>, ShopifyError> {
        let mut all_products: Vec<CatalogProduct> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page_count = 0usize;

        loop {
            page_count += 1;
            if page_count > MAX_PAGES {
                return Err(ShopifyError::PaginationLimit {
                    max_pages: MAX_PAGES,
                });
            }

            if page_count > 1 && inter_request_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(inter_request_delay_ms)).await;
            }

            let page = self.fetch_catalog_page(cursor.as_deref()).await?;
            tracing::debug!(
                page = page_count,
                products = page.products.len(),
                "fetched catalog page"
            );
            all_products.extend(page.products);

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        tracing::info!(
            products = all_products.len(),
            pages = page_count,
            "fetched Shopify catalog"
        );
        Ok(all_products)
    }
}

fn parse_catalog_page(raw: Value) -> Result<CatalogPage, ShopifyError> {
    let response: GraphQlResponse =
        serde_json::from_value(raw).map_err(|e| ShopifyError::Deserialize {
            context: "catalog page".to_owned(),
            source: e,
        })?;

    if !response.errors.is_empty() {
        let throttled = response.errors.iter().any(|e| {
            e.extensions
                .as_ref()
                .and_then(|x| x.get("code"))
                .and_then(Value::as_str)
                == Some("THROTTLED")
        });
        if throttled {
            return Err(ShopifyError::RateLimited {
                retry_after_secs: 1,
            });
        }
        return Err(ShopifyError::GraphQl {
            messages: response.errors.into_iter().map(|e| e.message).collect(),
        });
    }

    let connection = response
        .data
        .and_then(|d| d.products)
        .ok_or_else(|| ShopifyError::UnexpectedShape {
            context: "GraphQL response without data.products".to_owned(),
        })?;

    let last_edge_cursor = connection.edges.last().and_then(|e| e.cursor.clone());
    let next_cursor = if connection.page_info.has_next_page {
        let cursor = connection.page_info.end_cursor.or(last_edge_cursor);
        if cursor.is_none() {
            return Err(ShopifyError::UnexpectedShape {
                context: "hasNextPage without a cursor".to_owned(),
            });
        }
        cursor
    } else {
        None
    };

    let products = connection
        .edges
        .into_iter()
        .map(|edge| CatalogProduct::from(edge.node))
        .collect();

    Ok(CatalogPage {
        products,
        next_cursor,
    })
}
