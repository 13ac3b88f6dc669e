//! Network transport behind the cache façade.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Method};
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::network::{FetchRequest, FetchResponse};

/// Performs one network request.
///
/// Transport failures are reported as `CacheError::Network`; any HTTP
/// status, including errors, is a successful fetch.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse>;
}

// == HTTP Fetcher ==
/// [`Fetcher`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CacheError::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| CacheError::Network(format!("Invalid method {}: {}", request.method, e)))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        debug!(url = %request.url, status, bytes = body.len(), "Fetched");

        let mut fetched = FetchResponse::new(status, body);
        fetched.headers = headers;
        Ok(fetched)
    }
}
