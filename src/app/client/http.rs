//! Core HTTP operations with rate limiting and a shared connection budget
//!
//! Every request made during a run goes through one `HttpHandler`. It holds a
//! connection permit from the moment the request is sent until the body has
//! been read, so no more than `max_connections` requests are ever in flight
//! across all chapter jobs.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::{Client, Response, StatusCode};
use tokio::sync::{Semaphore, SemaphorePermit};
use url::Url;

use crate::constants::{http, limits};
use crate::errors::{DownloadError, DownloadResult};

/// HTTP operations handler with rate limiting and a connection budget
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>,
    connections: Semaphore,
    max_connections: usize,
    throttle_retries: u32,
}

impl HttpHandler {
    /// Creates a new HttpHandler
    ///
    /// # Arguments
    ///
    /// * `client` - The HTTP client to use for requests
    /// * `rate_limit_rps` - Requests per second rate limit
    /// * `max_connections` - Requests allowed in flight at once
    /// * `throttle_retries` - Replays of a 429/503 response
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::ConfigurationError` if the rate limit or the
    /// connection budget is zero
    pub fn new(
        client: Client,
        rate_limit_rps: u32,
        max_connections: usize,
        throttle_retries: u32,
    ) -> DownloadResult<Self> {
        if max_connections == 0 {
            return Err(DownloadError::ConfigurationError(
                "Connection budget must be non-zero".to_string(),
            ));
        }

        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
            connections: Semaphore::new(max_connections),
            max_connections,
            throttle_retries,
        })
    }

    fn build_rate_limiter(
        rate_limit_rps: u32,
    ) -> DownloadResult<RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>> {
        let rps = NonZeroU32::new(rate_limit_rps).ok_or_else(|| {
            DownloadError::ConfigurationError("Rate limit must be non-zero".to_string())
        })?;
        Ok(RateLimiter::direct(Quota::per_second(rps)))
    }

    async fn acquire_connection(&self) -> DownloadResult<SemaphorePermit<'_>> {
        self.connections.acquire().await.map_err(|_| {
            DownloadError::ConfigurationError("Connection pool has been closed".to_string())
        })
    }

    /// Sends a GET request, replaying throttled responses when configured to
    ///
    /// Transport errors are returned immediately; the caller decides what a
    /// failed request means for its chapter.
    async fn send(&self, url: &Url) -> DownloadResult<Response> {
        let mut retries = 0;
        loop {
            self.rate_limiter
                .until_ready_with_jitter(Jitter::up_to(http::RATE_LIMIT_JITTER))
                .await;

            let response = self.client.get(url.as_str()).send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE
            {
                if retries < self.throttle_retries {
                    retries += 1;
                    let delay =
                        Duration::from_millis(limits::RETRY_BASE_DELAY_MS * 2_u64.pow(retries));
                    tracing::warn!(
                        "Throttled by server ({}) for {}. Backing off for {}ms",
                        status.as_u16(),
                        url,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                if self.throttle_retries > 0 {
                    return Err(if status == StatusCode::TOO_MANY_REQUESTS {
                        DownloadError::RateLimitExceeded
                    } else {
                        DownloadError::ServerOverloaded
                    });
                }
            }

            return Ok(response);
        }
    }

    /// Fails with `HttpStatus` unless the response is exactly 200
    fn require_ok(url: &Url, response: &Response) -> DownloadResult<()> {
        if response.status() != StatusCode::OK {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    /// Fetches a page body as text
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::HttpStatus` for any non-200 answer and
    /// `DownloadError::Http` for transport failures
    pub async fn get_text(&self, url: &Url) -> DownloadResult<String> {
        let _permit = self.acquire_connection().await?;
        let response = self.send(url).await?;
        Self::require_ok(url, &response)?;
        let text = response.text().await?;
        tracing::debug!("Fetched page {} ({} bytes)", url, text.len());
        Ok(text)
    }

    /// Fetches a response body as raw bytes
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::HttpStatus` for any non-200 answer and
    /// `DownloadError::Http` for transport failures
    pub async fn get_bytes(&self, url: &Url) -> DownloadResult<Vec<u8>> {
        let _permit = self.acquire_connection().await?;
        let response = self.send(url).await?;
        Self::require_ok(url, &response)?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Size of the connection budget
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Connection permits not currently held by a request
    pub fn idle_connections(&self) -> usize {
        self.connections.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::config::ClientConfig;

    #[tokio::test]
    async fn test_rate_limiter_creation() {
        let rate_limiter = HttpHandler::build_rate_limiter(5).unwrap();
        rate_limiter.until_ready().await;
    }

    #[test]
    fn test_rate_limiter_zero_fails() {
        let result = HttpHandler::build_rate_limiter(0);
        assert!(matches!(result, Err(DownloadError::ConfigurationError(_))));
    }

    #[tokio::test]
    async fn test_http_handler_creation() {
        let client = ClientConfig::default().build_http_client(10).unwrap();
        let handler = HttpHandler::new(client, 5, 10, 0).unwrap();
        assert_eq!(handler.max_connections(), 10);
        assert_eq!(handler.idle_connections(), 10);
    }

    #[tokio::test]
    async fn test_zero_connection_budget_fails() {
        let client = ClientConfig::default().build_http_client(1).unwrap();
        let result = HttpHandler::new(client, 5, 0, 0);
        assert!(matches!(result, Err(DownloadError::ConfigurationError(_))));
    }

    #[tokio::test]
    async fn test_connection_permits_are_bounded() {
        let client = ClientConfig::default().build_http_client(2).unwrap();
        let handler = HttpHandler::new(client, 5, 2, 0).unwrap();

        let first = handler.acquire_connection().await.unwrap();
        let second = handler.acquire_connection().await.unwrap();
        assert_eq!(handler.idle_connections(), 0);
        assert!(handler.connections.try_acquire().is_err());

        drop(first);
        assert_eq!(handler.idle_connections(), 1);
        drop(second);
        assert_eq!(handler.idle_connections(), 2);
    }
}
