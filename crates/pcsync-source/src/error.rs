use thiserror::Error;

/// Errors returned by the PC Service API client.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The login endpoint rejected the configured credentials.
    #[error("PC Service authentication failed with status {status}: {body}")]
    Auth { status: u16, body: String },

    /// The login endpoint answered 200 without a token.
    #[error("PC Service login response did not contain a token")]
    MissingToken,

    /// Any other non-2xx answer from the API.
    #[error("PC Service API error {status}: {message}")]
    Api { status: u16, message: String },

    /// A date range kept tripping the product limit down to a span that
    /// cannot be split further.
    #[error("too many products between {from} and {to}, range cannot be split further")]
    RangeTooDense { from: String, to: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid PC Service base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl SourceError {
    /// `true` when the API refused a date-range query because the range
    /// matched more products than it will return in one response.
    #[must_use]
    pub fn is_too_many_products(&self) -> bool {
        match self {
            SourceError::Api { status, message } => {
                *status == 413 || message.to_ascii_lowercase().contains("too many")
            }
            _ => false,
        }
    }

    /// HTTP status to surface to facade callers.
    #[must_use]
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            SourceError::Api { status, .. } | SourceError::Auth { status, .. } => Some(*status),
            SourceError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_many_products_matches_message_case_insensitively() {
        let err = SourceError::Api {
            status: 400,
            message: "Too Many Products in requested range".to_owned(),
        };
        assert!(err.is_too_many_products());
    }

    #[test]
    fn too_many_products_matches_payload_too_large() {
        let err = SourceError::Api {
            status: 413,
            message: String::new(),
        };
        assert!(err.is_too_many_products());
    }

    #[test]
    fn other_api_errors_are_not_too_many_products() {
        let err = SourceError::Api {
            status: 404,
            message: "Product not found".to_owned(),
        };
        assert!(!err.is_too_many_products());
        assert!(!SourceError::MissingToken.is_too_many_products());
    }
}
