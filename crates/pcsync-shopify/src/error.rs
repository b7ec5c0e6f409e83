use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShopifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by Shopify (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("Shopify resource not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}: {body}")]
    UnexpectedStatus {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Shopify GraphQL errors: {}", messages.join("; "))]
    GraphQl { messages: Vec<String> },

    #[error("unexpected Shopify response shape: {context}")]
    UnexpectedShape { context: String },

    #[error("pagination limit reached: exceeded {max_pages} pages")]
    PaginationLimit { max_pages: usize },

    #[error("invalid Shopify id \"{value}\"")]
    InvalidId { value: String },

    #[error("invalid Shopify admin URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl ShopifyError {
    /// HTTP status to surface to facade callers.
    #[must_use]
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            ShopifyError::UnexpectedStatus { status, .. } => Some(*status),
            ShopifyError::NotFound { .. } => Some(404),
            ShopifyError::RateLimited { .. } => Some(429),
            ShopifyError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Shopify's own error payload (`{"errors": ...}`), when the response
    /// carried one.
    #[must_use]
    pub fn upstream_body(&self) -> Option<serde_json::Value> {
        match self {
            ShopifyError::UnexpectedStatus { body, .. } => serde_json::from_str(body).ok(),
            _ => None,
        }
    }
}
