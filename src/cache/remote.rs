use super::{cache_key, SuggestionCache};
use crate::metrics::Metrics;
use crate::service::types::Suggestion;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const ENDPOINT_GET: &str = "/cache/get";
const ENDPOINT_SET: &str = "/cache/set";
const ENDPOINT_DELETE: &str = "/cache/delete";
const ENDPOINT_EXPIRE: &str = "/cache/expire";

const REQUEST_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Serialize, Deserialize)]
struct SetRequest {
    key: String,
    /// The payload serialized as a JSON string.
    value_json: String,
    ttl_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct KeyRequest {
    key: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ExpireRequest {
    key: String,
    ttl_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct GetResponse {
    /// The payload, if found, serialized as a JSON string.
    value_json: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RemoteCacheConfig {
    pub host: String,
    pub port: u16,
    pub credential: Option<String>,
    pub db: u32,
    pub ttl: Duration,
}

/// Remote cache variant: a thin client for an HTTP key-value store. Keys
/// are namespaced by the configured logical database; requests carry a
/// bearer credential when one is configured.
pub struct RemoteCache {
    client: reqwest::Client,
    base_url: String,
    credential: Option<String>,
    db: u32,
    ttl: Duration,
    metrics: Arc<Metrics>,
}

impl RemoteCache {
    pub fn new(config: RemoteCacheConfig, metrics: Arc<Metrics>) -> Arc<Self> {
        Arc::new(Self {
            client: reqwest::Client::new(),
            base_url: format!("http://{}:{}", config.host, config.port),
            credential: config.credential,
            db: config.db,
            ttl: config.ttl,
            metrics,
        })
    }

    fn request(&self, method: reqwest::Method, endpoint: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, endpoint))
            .timeout(REQUEST_TIMEOUT);
        if let Some(credential) = &self.credential {
            builder = builder.bearer_auth(credential);
        }
        builder
    }

    fn namespaced_key(&self, prefix: &str) -> String {
        format!("{}:{}", self.db, cache_key(prefix))
    }

    async fn send_with_retry(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
        attempts: usize,
    ) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 0..attempts {
            match build().send().await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == attempts {
                        return Err(anyhow::anyhow!(e));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow::anyhow!("Retry attempts exhausted"))
    }

    /// Fire-and-forget expiry refresh so a hit keeps the entry warm, same
    /// as the in-process variant's sliding TTL.
    fn touch(&self, key: String) {
        let request = self
            .request(reqwest::Method::POST, ENDPOINT_EXPIRE)
            .json(&ExpireRequest {
                key,
                ttl_seconds: self.ttl.as_secs(),
            });
        tokio::spawn(async move {
            if let Err(e) = request.send().await {
                tracing::debug!("Cache expire refresh failed: {}", e);
            }
        });
    }
}

#[async_trait]
impl SuggestionCache for RemoteCache {
    async fn get(&self, prefix: &str) -> Option<Vec<Suggestion>> {
        let key = self.namespaced_key(prefix);

        let response = match self
            .send_with_retry(
                || {
                    self.request(reqwest::Method::GET, ENDPOINT_GET)
                        .query(&[("key", key.as_str())])
                },
                2,
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                // A remote failure is indistinguishable from a miss for the
                // caller; the read path falls through to the index.
                tracing::error!("Failed to get from remote cache: {}", e);
                self.metrics.record_error("cache", "get_failed");
                self.metrics.record_cache_miss("remote");
                return None;
            }
        };

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            self.metrics.record_cache_miss("remote");
            return None;
        }
        if !response.status().is_success() {
            tracing::error!("Remote cache get returned {}", response.status());
            self.metrics.record_error("cache", "get_failed");
            self.metrics.record_cache_miss("remote");
            return None;
        }

        let payload: GetResponse = match response.json().await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to decode remote cache payload: {}", e);
                self.metrics.record_error("cache", "decode_failed");
                self.metrics.record_cache_miss("remote");
                return None;
            }
        };

        let suggestions: Vec<Suggestion> = match payload.value_json {
            Some(value_json) => match serde_json::from_str(&value_json) {
                Ok(suggestions) => suggestions,
                Err(e) => {
                    tracing::error!("Failed to decode cached suggestions: {}", e);
                    self.metrics.record_error("cache", "decode_failed");
                    self.metrics.record_cache_miss("remote");
                    return None;
                }
            },
            None => {
                self.metrics.record_cache_miss("remote");
                return None;
            }
        };

        self.metrics.record_cache_hit("remote");
        self.touch(key);
        Some(suggestions)
    }

    async fn set(&self, prefix: &str, suggestions: Vec<Suggestion>) -> Result<()> {
        let payload = SetRequest {
            key: self.namespaced_key(prefix),
            value_json: serde_json::to_string(&suggestions)?,
            ttl_seconds: self.ttl.as_secs(),
        };

        let response = self
            .send_with_retry(
                || {
                    self.request(reqwest::Method::POST, ENDPOINT_SET)
                        .json(&payload)
                },
                3,
            )
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Remote cache set failed: {}",
                response.status()
            ));
        }
        Ok(())
    }

    async fn delete(&self, prefix: &str) -> Result<()> {
        let payload = KeyRequest {
            key: self.namespaced_key(prefix),
        };

        let response = self
            .send_with_retry(
                || {
                    self.request(reqwest::Method::POST, ENDPOINT_DELETE)
                        .json(&payload)
                },
                3,
            )
            .await?;

        // Missing keys are fine; delete is idempotent.
        if !response.status().is_success() && response.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(anyhow::anyhow!(
                "Remote cache delete failed: {}",
                response.status()
            ));
        }
        Ok(())
    }
}
