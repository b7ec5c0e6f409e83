use std::time::Duration;

use reqwest::{Client, Method, StatusCode, Url};
use serde_json::Value;

use crate::error::ShopifyError;
use crate::rate_limit::{retry_with_backoff, RetryPolicy};

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// HTTP client for one shop's Admin API (REST and GraphQL).
///
/// Every request carries the shop's access token. Responses map to typed
/// errors: 429 → [`ShopifyError::RateLimited`], 404 → [`ShopifyError::NotFound`],
/// other non-2xx → [`ShopifyError::UnexpectedStatus`] with the response body.
///
/// Throttling is retried with exponential backoff up to `max_retries`
/// additional attempts. Network failures and 5xx answers are retried the same
/// way only for idempotent methods and explicitly repeatable POSTs, so a lost
/// answer to a create never produces a second product.
pub struct ShopifyClient {
    client: Client,
    base_url: Url,
    access_token: String,
    max_retries: u32,
    backoff_base_secs: u64,
}

/// `https://{shop}.myshopify.com/admin/api/{version}/`
#[must_use]
pub fn admin_base_url(shop_name: &str, api_version: &str) -> String {
    format!("https://{shop_name}.myshopify.com/admin/api/{api_version}/")
}

impl ShopifyClient {
    /// Creates a client for `shop_name` on the given Admin API version.
    ///
    /// # Errors
    ///
    /// Returns [`ShopifyError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ShopifyError::InvalidBaseUrl`] if the shop
    /// name does not form a valid host.
    pub fn new(
        shop_name: &str,
        api_version: &str,
        access_token: &str,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ShopifyError> {
        Self::with_base_url(
            &admin_base_url(shop_name, api_version),
            access_token,
            timeout_secs,
            max_retries,
            backoff_base_secs,
        )
    }

    /// Creates a client rooted at an arbitrary admin URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Same as [`ShopifyClient::new`].
    pub fn with_base_url(
        base_url: &str,
        access_token: &str,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ShopifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("pcsync/0.1 (catalog-sync)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ShopifyError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            access_token: access_token.to_owned(),
            max_retries,
            backoff_base_secs,
        })
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, ShopifyError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ShopifyError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    /// Sends one request and returns the parsed JSON body, retrying as the
    /// method allows. An empty 2xx body yields `Value::Null`.
    pub(crate) async fn request_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ShopifyError> {
        let policy = RetryPolicy::for_method(&method);
        self.request_json_with(policy, method, path, body).await
    }

    /// Like [`Self::request_json`] with an explicit retry policy, for POSTs
    /// whose effect does not change when repeated.
    pub(crate) async fn request_json_with(
        &self,
        policy: RetryPolicy,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ShopifyError> {
        let url = self.endpoint(path)?;
        self.with_retry(policy, || self.send_once(method.clone(), &url, body))
            .await
    }

    pub(crate) async fn with_retry<T, F, Fut>(
        &self,
        policy: RetryPolicy,
        operation: F,
    ) -> Result<T, ShopifyError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, ShopifyError>>,
    {
        retry_with_backoff(policy, self.max_retries, self.backoff_base_secs, operation).await
    }

    /// Single attempt, no retry.
    pub(crate) async fn send_once(
        &self,
        method: Method,
        url: &Url,
        body: Option<&Value>,
    ) -> Result<Value, ShopifyError> {
        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .header(ACCESS_TOKEN_HEADER, &self.access_token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after)
                .unwrap_or(2);
            return Err(ShopifyError::RateLimited { retry_after_secs });
        }

        let text = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(ShopifyError::NotFound {
                url: url.to_string(),
            });
        }

        if !status.is_success() {
            return Err(ShopifyError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ShopifyError::Deserialize {
            context: format!("{method} {}", url.path()),
            source: e,
        })
    }
}

/// Shopify sends `Retry-After` as fractional seconds (`"2.0"`).
fn parse_retry_after(raw: &str) -> Option<u64> {
    let secs: f64 = raw.trim().parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rounded = secs.ceil() as u64;
    Some(rounded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_base_url_uses_shop_and_version() {
        assert_eq!(
            admin_base_url("tiendalibre", "2024-10"),
            "https://tiendalibre.myshopify.com/admin/api/2024-10/"
        );
    }

    #[test]
    fn endpoint_joins_relative_paths() {
        let client = ShopifyClient::new("tiendalibre", "2024-10", "tok", 30, 0, 0).unwrap();
        let url = client.endpoint("products/42.json").unwrap();
        assert_eq!(
            url.as_str(),
            "https://tiendalibre.myshopify.com/admin/api/2024-10/products/42.json"
        );
    }

    #[test]
    fn retry_after_parses_fractional_seconds() {
        assert_eq!(parse_retry_after("2.0"), Some(2));
        assert_eq!(parse_retry_after("1.5"), Some(2));
        assert_eq!(parse_retry_after("7"), Some(7));
        assert_eq!(parse_retry_after("soon"), None);
    }
}
