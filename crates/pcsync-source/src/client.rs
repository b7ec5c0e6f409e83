//! HTTP client for the PC Service product API.
//!
//! Every call goes through a cached bearer token. A 401 drops the cache and
//! repeats the request once with a fresh login; transient failures are
//! retried with back-off. Non-2xx answers surface as [`SourceError::Api`]
//! carrying the body's `message` field when there is one.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode, Url};
use serde::Serialize;
use serde_json::Value;

use crate::error::SourceError;
use crate::range::DateRange;
use crate::retry::retry_with_backoff;
use crate::token::TokenCache;
use crate::types::SourceProduct;

const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(600);
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_BASE_MS: u64 = 2_000;

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Client for the PC Service REST API.
pub struct SourceClient {
    client: Client,
    base_url: Url,
    username: String,
    password: String,
    tokens: TokenCache,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl SourceClient {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`SourceError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn new(
        base_url: &str,
        username: &str,
        password: &str,
        timeout_secs: u64,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("pcsync/0.1 (catalog-sync)")
            .build()?;

        // A trailing slash keeps `Url::join` from replacing the last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let parsed = Url::parse(&normalised).map_err(|e| SourceError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url: parsed,
            username: username.to_owned(),
            password: password.to_owned(),
            tokens: TokenCache::new(DEFAULT_TOKEN_TTL),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
        })
    }

    #[must_use]
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.tokens = TokenCache::new(ttl);
        self
    }

    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Logs in with the configured credentials and returns a fresh token.
    ///
    /// Bypasses the token cache; most callers want the cached path that the
    /// other methods use.
    ///
    /// # Errors
    ///
    /// - [`SourceError::Auth`] when the login endpoint answers non-2xx.
    /// - [`SourceError::MissingToken`] when the response has no usable token.
    /// - [`SourceError::Http`] on network failure.
    pub async fn authenticate(&self) -> Result<String, SourceError> {
        let url = self.endpoint("auth/login")?;
        tracing::info!(url = %url, "authenticating against PC Service");

        let response = self
            .client
            .post(url.clone())
            .json(&LoginRequest {
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "PC Service login rejected");
            return Err(SourceError::Auth {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = serde_json::from_str(&body).map_err(|e| SourceError::Deserialize {
            context: "auth/login".to_owned(),
            source: e,
        })?;
        payload
            .get("token")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(ToOwned::to_owned)
            .ok_or(SourceError::MissingToken)
    }

    /// Category tree, one category, or the products of a subcategory,
    /// returned as raw JSON.
    ///
    /// `subcategory_id` is only honoured together with `category_id`.
    ///
    /// # Errors
    ///
    /// See [`SourceClient::product_json`].
    pub async fn categories(
        &self,
        category_id: Option<u64>,
        subcategory_id: Option<u64>,
    ) -> Result<Value, SourceError> {
        let path = match (category_id, subcategory_id) {
            (Some(cat), Some(sub)) => format!("categories/{cat}/{sub}/products"),
            (Some(cat), None) => format!("categories/{cat}"),
            (None, _) => "categories/".to_owned(),
        };
        self.get_json(&path, &[]).await
    }

    /// Raw JSON for a single product.
    ///
    /// # Errors
    ///
    /// - [`SourceError::Api`] on a non-2xx answer (e.g. 404 for unknown ids).
    /// - [`SourceError::Auth`] / [`SourceError::MissingToken`] if login fails.
    /// - [`SourceError::Http`] on network failure.
    /// - [`SourceError::Deserialize`] if the body is not JSON.
    pub async fn product_json(&self, product_id: u64) -> Result<Value, SourceError> {
        self.get_json(&format!("products/{product_id}"), &[]).await
    }

    /// Typed variant of [`SourceClient::product_json`].
    ///
    /// # Errors
    ///
    /// As [`SourceClient::product_json`], plus [`SourceError::Deserialize`]
    /// when the JSON does not match [`SourceProduct`].
    pub async fn product(&self, product_id: u64) -> Result<SourceProduct, SourceError> {
        let body = self.product_json(product_id).await?;
        serde_json::from_value(body).map_err(|e| SourceError::Deserialize {
            context: format!("products/{product_id}"),
            source: e,
        })
    }

    /// Products changed within `range`.
    ///
    /// When the API refuses a range for holding too many products, the range
    /// is split into three and each part fetched in turn, recursively. The
    /// result keeps chronological order of the sub-ranges.
    ///
    /// # Errors
    ///
    /// - [`SourceError::RangeTooDense`] if a sub-range shorter than three
    ///   seconds still trips the limit.
    /// - Any other error from the underlying requests.
    pub async fn products_by_date(
        &self,
        range: DateRange,
    ) -> Result<Vec<SourceProduct>, SourceError> {
        // Depth-first over a stack; parts are pushed in reverse so the
        // earliest sub-range is fetched next.
        let mut pending = vec![range];
        let mut products = Vec::new();

        while let Some(current) = pending.pop() {
            match self.fetch_range(&current).await {
                Ok(batch) => {
                    tracing::info!(
                        range = %current,
                        count = batch.len(),
                        "fetched changed products"
                    );
                    products.extend(batch);
                }
                Err(err) if err.is_too_many_products() => {
                    let parts = current.split_three().ok_or_else(|| SourceError::RangeTooDense {
                        from: current.from_param(),
                        to: current.to_param(),
                    })?;
                    tracing::info!(
                        range = %current,
                        "too many products in range, splitting in three"
                    );
                    pending.extend(parts.into_iter().rev());
                }
                Err(err) => return Err(err),
            }
        }

        Ok(products)
    }

    async fn fetch_range(&self, range: &DateRange) -> Result<Vec<SourceProduct>, SourceError> {
        let query = [("from", range.from_param()), ("to", range.to_param())];
        let body = self.get_json("products/bydate", &query).await?;

        let items: Vec<Value> =
            serde_json::from_value(body).map_err(|e| SourceError::Deserialize {
                context: format!("products/bydate({range})"),
                source: e,
            })?;

        let products = items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<SourceProduct>(item) {
                Ok(product) => Some(product),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed product in bydate response");
                    None
                }
            })
            .collect();
        Ok(products)
    }

    fn endpoint(&self, path: &str) -> Result<Url, SourceError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| SourceError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn token(&self) -> Result<String, SourceError> {
        self.tokens.get_or_refresh(|| self.authenticate()).await
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, SourceError> {
        let url = self.endpoint(path)?;
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.get_json_once(&url, query)
        })
        .await
    }

    async fn get_json_once(
        &self,
        url: &Url,
        query: &[(&str, String)],
    ) -> Result<Value, SourceError> {
        let token = self.token().await?;
        let mut response = self.send_get(url, query, &token).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(url = %url, "PC Service rejected cached token, logging in again");
            self.tokens.invalidate().await;
            let token = self.token().await?;
            response = self.send_get(url, query, &token).await?;
        }

        Self::read_json(response, url).await
    }

    async fn send_get(
        &self,
        url: &Url,
        query: &[(&str, String)],
        token: &str,
    ) -> Result<Response, SourceError> {
        Ok(self
            .client
            .get(url.clone())
            .query(query)
            .bearer_auth(token)
            .send()
            .await?)
    }

    async fn read_json(response: Response, url: &Url) -> Result<Value, SourceError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SourceError::Api {
                status: status.as_u16(),
                message: error_message(&body, status),
            });
        }

        serde_json::from_str(&body).map_err(|e| SourceError::Deserialize {
            context: url.path().to_owned(),
            source: e,
        })
    }
}

/// `message` (or `error`) from a JSON error body, else the raw body, else
/// the status reason.
fn error_message(body: &str, status: StatusCode) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(msg) = ["message", "error"]
            .iter()
            .find_map(|key| json.get(key).and_then(Value::as_str))
        {
            return msg.to_owned();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_owned()
    } else {
        trimmed.chars().take(500).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> SourceClient {
        SourceClient::new(base_url, "user", "pass", 30)
            .expect("client construction should not fail")
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let client = test_client("https://pcservice.example.com/api");
        let url = client.endpoint("products/42").unwrap();
        assert_eq!(url.as_str(), "https://pcservice.example.com/api/products/42");
    }

    #[test]
    fn endpoint_tolerates_trailing_and_leading_slashes() {
        let client = test_client("https://pcservice.example.com/api/");
        let url = client.endpoint("/categories/").unwrap();
        assert_eq!(url.as_str(), "https://pcservice.example.com/api/categories/");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = SourceClient::new("not a url", "u", "p", 30);
        assert!(matches!(result, Err(SourceError::InvalidBaseUrl { .. })));
    }

    #[test]
    fn error_message_prefers_json_message_field() {
        assert_eq!(
            error_message(r#"{"message":"Product not found"}"#, StatusCode::NOT_FOUND),
            "Product not found"
        );
        assert_eq!(error_message("", StatusCode::NOT_FOUND), "Not Found");
        assert_eq!(
            error_message("plain failure", StatusCode::BAD_GATEWAY),
            "plain failure"
        );
    }
}
