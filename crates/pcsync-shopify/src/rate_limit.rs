//! Retry with exponential back-off for Shopify Admin API calls.
//!
//! Throttling (429) is always retried: Shopify rejected the request before
//! processing it. Timeouts, connection failures and 5xx answers are retried
//! only for repeatable requests, since a create may already have been
//! committed when the answer is lost. Every other error means the request
//! itself is wrong and would fail the same way again.

use std::future::Future;
use std::time::Duration;

use reqwest::Method;

use crate::error::ShopifyError;

/// Which failures a request may be retried on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RetryPolicy {
    /// Throttling, timeouts, connection failures and 5xx.
    Transient,
    /// Throttling only.
    ThrottleOnly,
}

impl RetryPolicy {
    /// `Transient` for idempotent methods (GET, PUT, DELETE, ...), otherwise
    /// `ThrottleOnly`.
    pub(crate) fn for_method(method: &Method) -> Self {
        if method.is_idempotent() {
            Self::Transient
        } else {
            Self::ThrottleOnly
        }
    }

    fn allows(self, err: &ShopifyError) -> bool {
        match err {
            ShopifyError::RateLimited { .. } => true,
            ShopifyError::Http(e) => self == Self::Transient && (e.is_timeout() || e.is_connect()),
            ShopifyError::UnexpectedStatus { status, .. } => {
                self == Self::Transient && *status >= 500
            }
            _ => false,
        }
    }
}

/// Runs `operation`, retrying failures `policy` allows up to `max_retries`
/// times.
///
/// The wait before retry `n` is `backoff_base_secs * 2^(n-1)` seconds, or the
/// server's `Retry-After` when that is longer.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, ShopifyError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ShopifyError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !policy.allows(&err) || attempt >= max_retries {
            return Err(err);
        }

        let mut delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        if let ShopifyError::RateLimited { retry_after_secs } = &err {
            if backoff_base_secs > 0 {
                delay_secs = delay_secs.max(*retry_after_secs);
            }
        }
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %err,
            "transient Shopify error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn unexpected(status: u16) -> ShopifyError {
        ShopifyError::UnexpectedStatus {
            status,
            url: "https://shop.example/admin".to_owned(),
            body: String::new(),
        }
    }

    #[tokio::test]
    async fn retries_rate_limited_then_succeeds() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(RetryPolicy::Transient, 3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                let n = cc.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(ShopifyError::RateLimited {
                        retry_after_secs: 2,
                    })
                } else {
                    Ok::<u32, ShopifyError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retries_server_errors_until_exhausted() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(RetryPolicy::Transient, 2, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ShopifyError>(unexpected(502))
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
        assert!(matches!(
            result,
            Err(ShopifyError::UnexpectedStatus { status: 502, .. })
        ));
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(RetryPolicy::Transient, 3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ShopifyError>(unexpected(422))
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn does_not_retry_graphql_errors() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(RetryPolicy::Transient, 3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ShopifyError>(ShopifyError::GraphQl {
                    messages: vec!["Field 'x' doesn't exist".to_owned()],
                })
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ShopifyError::GraphQl { .. })));
    }

    #[tokio::test]
    async fn throttle_only_does_not_retry_server_errors() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(RetryPolicy::ThrottleOnly, 3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ShopifyError>(unexpected(502))
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result,
            Err(ShopifyError::UnexpectedStatus { status: 502, .. })
        ));
    }

    #[tokio::test]
    async fn throttle_only_still_retries_rate_limits() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(RetryPolicy::ThrottleOnly, 3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                if cc.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ShopifyError::RateLimited {
                        retry_after_secs: 1,
                    })
                } else {
                    Ok::<u32, ShopifyError>(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn policy_follows_method_idempotency() {
        assert_eq!(RetryPolicy::for_method(&Method::GET), RetryPolicy::Transient);
        assert_eq!(RetryPolicy::for_method(&Method::PUT), RetryPolicy::Transient);
        assert_eq!(
            RetryPolicy::for_method(&Method::POST),
            RetryPolicy::ThrottleOnly
        );
    }
}
