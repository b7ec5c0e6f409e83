//! Admin REST endpoints used by the sync and the facade.

use reqwest::Method;
use serde_json::{json, Value};

use crate::client::ShopifyClient;
use crate::error::ShopifyError;
use crate::rate_limit::RetryPolicy;
use crate::types::{CreatedProduct, Location, NewProduct, ProductStatus, ProductUpdate};

const METAFIELD_NAMESPACE: &str = "custom";

impl ShopifyClient {
    /// Creates a product and returns Shopify's ids for it.
    ///
    /// # Errors
    ///
    /// - [`ShopifyError::UnexpectedStatus`] when Shopify rejects the payload
    ///   (typically 422 with an `errors` object in the body).
    /// - [`ShopifyError::UnexpectedShape`] if the response has no `product`.
    /// - Transport and deserialization errors.
    pub async fn create_product(
        &self,
        product: &NewProduct,
    ) -> Result<CreatedProduct, ShopifyError> {
        let response = self
            .create_product_raw(&json!({ "product": product }))
            .await?;
        let created = response
            .get("product")
            .cloned()
            .ok_or_else(|| ShopifyError::UnexpectedShape {
                context: "products.json response without `product`".to_owned(),
            })?;
        let created: CreatedProduct =
            serde_json::from_value(created).map_err(|e| ShopifyError::Deserialize {
                context: "created product".to_owned(),
                source: e,
            })?;
        tracing::info!(product_id = created.id, title = %created.title, "created Shopify product");
        Ok(created)
    }

    /// `POST products.json` with a caller-supplied body; returns Shopify's
    /// response unchanged.
    ///
    /// # Errors
    ///
    /// See [`ShopifyClient::create_product`].
    pub async fn create_product_raw(&self, payload: &Value) -> Result<Value, ShopifyError> {
        self.request_json(Method::POST, "products.json", Some(payload))
            .await
    }

    /// Applies a partial update to a product and its variants.
    ///
    /// # Errors
    ///
    /// [`ShopifyError::NotFound`] for unknown products, plus the usual
    /// transport and status errors.
    pub async fn update_product(&self, update: &ProductUpdate) -> Result<(), ShopifyError> {
        let path = format!("products/{}.json", update.id);
        self.request_json(Method::PUT, &path, Some(&json!({ "product": update })))
            .await?;
        tracing::debug!(product_id = update.id, "updated Shopify product");
        Ok(())
    }

    /// # Errors
    ///
    /// See [`ShopifyClient::update_product`].
    pub async fn set_status(
        &self,
        product_id: u64,
        status: ProductStatus,
    ) -> Result<(), ShopifyError> {
        let mut update = ProductUpdate::new(product_id);
        update.status = Some(status);
        self.update_product(&update).await
    }

    /// Sets the absolute available quantity of an inventory item at a location.
    ///
    /// # Errors
    ///
    /// Transport and status errors from `inventory_levels/set.json`.
    pub async fn set_inventory(
        &self,
        inventory_item_id: u64,
        location_id: u64,
        available: i64,
    ) -> Result<(), ShopifyError> {
        let body = json!({
            "location_id": location_id,
            "inventory_item_id": inventory_item_id,
            "available": available,
        });
        self.request_json_with(
            RetryPolicy::Transient,
            Method::POST,
            "inventory_levels/set.json",
            Some(&body),
        )
        .await?;
        tracing::debug!(inventory_item_id, location_id, available, "set inventory level");
        Ok(())
    }

    /// All locations of the shop.
    ///
    /// # Errors
    ///
    /// Transport, status and deserialization errors.
    pub async fn locations(&self) -> Result<Vec<Location>, ShopifyError> {
        let response = self
            .request_json(Method::GET, "locations.json", None)
            .await?;
        let list = response
            .get("locations")
            .cloned()
            .unwrap_or(Value::Array(Vec::new()));
        serde_json::from_value(list).map_err(|e| ShopifyError::Deserialize {
            context: "locations.json".to_owned(),
            source: e,
        })
    }

    /// The first active location, falling back to the first one listed.
    ///
    /// # Errors
    ///
    /// [`ShopifyError::UnexpectedShape`] when the shop has no locations.
    pub async fn primary_location_id(&self) -> Result<u64, ShopifyError> {
        let locations = self.locations().await?;
        locations
            .iter()
            .find(|l| l.active.unwrap_or(true))
            .or_else(|| locations.first())
            .map(|l| l.id)
            .ok_or_else(|| ShopifyError::UnexpectedShape {
                context: "shop has no locations".to_owned(),
            })
    }

    /// Links a product to its source record: `custom.pc_service_id`
    /// (integer) and `custom.proveedor` (supplier name).
    ///
    /// # Errors
    ///
    /// The first metafield write that fails; later ones are not attempted.
    pub async fn assign_source_metafields(
        &self,
        product_id: u64,
        pc_service_id: u64,
        supplier: &str,
    ) -> Result<(), ShopifyError> {
        let path = format!("products/{product_id}/metafields.json");
        let metafields = [
            json!({
                "namespace": METAFIELD_NAMESPACE,
                "key": "pc_service_id",
                "value": pc_service_id,
                "type": "number_integer",
            }),
            json!({
                "namespace": METAFIELD_NAMESPACE,
                "key": "proveedor",
                "value": supplier,
                "type": "single_line_text_field",
            }),
        ];

        for metafield in metafields {
            let key = metafield["key"].as_str().unwrap_or_default().to_owned();
            self.request_json(Method::POST, &path, Some(&json!({ "metafield": metafield })))
                .await
                .inspect_err(|e| {
                    tracing::error!(
                        product_id,
                        key = %key,
                        error = %e,
                        "failed to assign metafield"
                    );
                })?;
            tracing::debug!(product_id, key = %key, "assigned metafield");
        }
        Ok(())
    }
}
