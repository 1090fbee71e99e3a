// ABOUTME: Blocking HTTP client for the Yuque open API
// ABOUTME: Handles throttling, auth headers, bounded retries and pagination

use crate::util::truncate_str;
use crate::{DocumentContent, DocumentSummary, Envelope, Error, RepositoryHandle, Result};
use rand::Rng;
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, warn};

pub const DEFAULT_API_BASE: &str = "https://www.yuque.com/api/v2";

/// Documents requested per listing call.
pub const PAGE_SIZE: usize = 100;

const USER_AGENT: &str = concat!("yuque-exporter/", env!("CARGO_PKG_VERSION"));

/// Read side of the remote knowledge base.
pub trait RemoteCatalog {
    /// Maps repository slug to its handle. Later duplicates replace earlier ones.
    fn list_repositories(&self, namespace: &str) -> Result<HashMap<String, RepositoryHandle>>;

    /// Walks every page from offset 0 until an empty page comes back.
    fn list_documents(&self, repo_id: u64) -> Result<Vec<DocumentSummary>>;

    fn fetch_document(&self, repo_id: u64, slug: &str) -> Result<DocumentContent>;
}

/// Raw bytes of an asset referenced from a document body.
pub trait AssetSource {
    fn fetch_asset(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct ApiClient {
    client: Client,
    base_url: String,
    token: String,
    throttle_min: u64,
    throttle_max: u64,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl ApiClient {
    pub fn new(token: String, base_url: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(ApiClient {
            client,
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.into()),
            token,
            throttle_min: 100,
            throttle_max: 300,
            max_retries: 2,
            retry_delay_ms: 500,
        })
    }

    pub fn with_throttle(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.throttle_min = min_ms;
        self.throttle_max = max_ms;
        self
    }

    pub fn disable_throttle(mut self) -> Self {
        self.throttle_min = 0;
        self.throttle_max = 0;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, delay_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_delay_ms = delay_ms;
        self
    }

    fn throttle(&self) {
        if self.throttle_max > 0 {
            let sleep_ms = rand::thread_rng().gen_range(self.throttle_min..=self.throttle_max);
            std::thread::sleep(Duration::from_millis(sleep_ms));
        }
    }

    fn wait_before_retry(&self, attempt: u32) {
        let base = self
            .retry_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        let jitter = if self.retry_delay_ms > 0 {
            rand::thread_rng().gen_range(0..100)
        } else {
            0
        };
        std::thread::sleep(Duration::from_millis(base.saturating_add(jitter)));
    }

    fn send(&self, url: &str, accept: &str) -> Result<Response> {
        let mut attempt = 0;
        loop {
            let result = self
                .client
                .get(url)
                .header("X-Auth-Token", &self.token)
                .header("Accept", accept)
                .header("User-Agent", USER_AGENT)
                .send();

            self.throttle();

            match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if attempt < self.max_retries && is_retryable_status(status) {
                        warn!(url, status = status.as_u16(), attempt, "retrying request");
                        self.wait_before_retry(attempt);
                        attempt += 1;
                        continue;
                    }

                    let message = response.text().unwrap_or_default();
                    error!(url, status = status.as_u16(), "request failed");
                    return Err(Error::Api {
                        endpoint: url.into(),
                        status: status.as_u16(),
                        message: truncate_str(&message, 100),
                    });
                }
                Err(err) => {
                    if attempt < self.max_retries && is_retryable_error(&err) {
                        warn!(url, error = %err, attempt, "retrying request");
                        self.wait_before_retry(attempt);
                        attempt += 1;
                        continue;
                    }
                    error!(url, error = %err, "request failed");
                    return Err(Error::Network(err));
                }
            }
        }
    }

    fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(url = %url, "GET");

        let body = self.send(&url, "application/json")?.text()?;
        serde_json::from_str::<Envelope<T>>(&body)
            .map(|envelope| envelope.data)
            .map_err(|e| {
                error!(
                    endpoint,
                    error = %e,
                    body = %truncate_str(&body, 500),
                    "failed to decode response"
                );
                Error::Malformed {
                    endpoint: endpoint.into(),
                    message: e.to_string(),
                }
            })
    }
}

impl RemoteCatalog for ApiClient {
    fn list_repositories(&self, namespace: &str) -> Result<HashMap<String, RepositoryHandle>> {
        let repos: Vec<RepositoryHandle> = self.get(&format!("/users/{}/repos", namespace))?;
        Ok(index_by_slug(repos))
    }

    fn list_documents(&self, repo_id: u64) -> Result<Vec<DocumentSummary>> {
        let mut docs = Vec::new();
        let mut offset = 0;
        loop {
            let page: Vec<DocumentSummary> = self.get(&format!(
                "/repos/{}/docs?limit={}&offset={}",
                repo_id, PAGE_SIZE, offset
            ))?;
            if page.is_empty() {
                break;
            }
            docs.extend(page);
            offset += PAGE_SIZE;
        }
        debug!(repo_id, count = docs.len(), "listed documents");
        Ok(docs)
    }

    fn fetch_document(&self, repo_id: u64, slug: &str) -> Result<DocumentContent> {
        self.get(&format!("/repos/{}/docs/{}", repo_id, slug))
    }
}

impl AssetSource for ApiClient {
    fn fetch_asset(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self.send(url, "*/*")?.bytes()?;
        Ok(bytes.to_vec())
    }
}

fn index_by_slug(repos: Vec<RepositoryHandle>) -> HashMap<String, RepositoryHandle> {
    let mut by_slug = HashMap::with_capacity(repos.len());
    for repo in repos {
        if let Some(previous) = by_slug.insert(repo.slug.clone(), repo) {
            warn!(
                slug = %previous.slug,
                replaced_id = previous.remote_id,
                "duplicate repository slug in listing"
            );
        }
    }
    by_slug
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}
