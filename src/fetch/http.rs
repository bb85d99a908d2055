// src/fetch/http.rs

//! Blocking HTTP fetcher with caching, retries and request pacing.

use std::cell::Cell;
use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::header::RETRY_AFTER;
use url::Url;

use crate::error::{AppError, Result};
use crate::fetch::{PageFetcher, PageRequest, Payload, ResponseCache};
use crate::models::{ClientConfig, Config};
use crate::utils::http::{create_client, is_retryable_status};

/// Fetches pages from the results site one request at a time.
pub struct HttpFetcher {
    client: Client,
    base_url: Url,
    config: ClientConfig,
    cache: Option<ResponseCache>,
    last_request: Cell<Option<Instant>>,
}

impl HttpFetcher {
    /// Create a fetcher from the application configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: create_client(&config.client)?,
            base_url: Url::parse(&config.client.base_url)?,
            config: config.client.clone(),
            cache: ResponseCache::from_config(&config.cache),
            last_request: Cell::new(None),
        })
    }

    /// Replace the response cache (`None` disables caching).
    pub fn with_cache(mut self, cache: Option<ResponseCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    /// Sleep until `request_delay_ms` has passed since the last request.
    fn throttle(&self) {
        let min_gap = Duration::from_millis(self.config.request_delay_ms);
        if let Some(last) = self.last_request.get() {
            let elapsed = last.elapsed();
            if elapsed < min_gap {
                thread::sleep(min_gap - elapsed);
            }
        }
        self.last_request.set(Some(Instant::now()));
    }

    /// GET `url`, retrying transport errors, 429 and 5xx responses.
    fn get_with_retry(&self, url: &Url) -> Result<String> {
        let attempts = self.config.max_retries + 1;
        let mut last_error = None;

        for attempt in 1..=attempts {
            self.throttle();
            let mut delay = Duration::from_millis(self.config.retry_delay_ms * u64::from(attempt));

            match self.client.get(url.clone()).send() {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .text()
                            .map_err(|e| AppError::network(url.as_str(), Some(status.as_u16()), e));
                    }

                    let error = AppError::network(
                        url.as_str(),
                        Some(status.as_u16()),
                        status.canonical_reason().unwrap_or("request failed"),
                    );
                    if !is_retryable_status(status) {
                        return Err(error);
                    }

                    if let Some(retry_after) = response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.trim().parse::<u64>().ok())
                    {
                        delay = delay.max(Duration::from_secs(retry_after));
                    }
                    last_error = Some(error);
                }
                Err(e) => last_error = Some(AppError::network(url.as_str(), None, e)),
            }

            if attempt < attempts {
                log::warn!(
                    "Request to {} failed (attempt {}/{}), retrying in {:?}",
                    url,
                    attempt,
                    attempts,
                    delay
                );
                thread::sleep(delay);
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::network(url.as_str(), None, "no attempt made")))
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, request: &PageRequest) -> Result<Payload> {
        let key = request.cache_key();

        if let Some(body) = self.cache.as_ref().and_then(|cache| cache.get(&key)) {
            log::debug!("Cache hit: {}", key);
            return Ok(Payload::from_body(body));
        }

        let url = request.url(&self.base_url)?;
        log::debug!("Fetching {}", url);
        let body = self.get_with_retry(&url)?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(&key, &body) {
                log::warn!("Failed to cache {}: {}", key, e);
            }
        }

        Ok(Payload::from_body(body))
    }
}
