use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{Result, TransportError};

/// Raw response of one transport attempt. Interpretation (status check,
/// parsing) belongs to the fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One strategy for reaching the upstream host.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;

    /// Host actually contacted when requesting `url`. Keys the politeness gate.
    fn host_for(&self, url: &str) -> String;

    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> std::result::Result<TransportResponse, TransportError>;
}

pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

pub fn host_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

async fn send(
    client: &reqwest::Client,
    url: reqwest::Url,
    headers: &[(String, String)],
) -> std::result::Result<TransportResponse, TransportError> {
    let mut req = client.get(url);
    for (k, v) in headers {
        req = req.header(k.as_str(), v.as_str());
    }
    let resp = req.send().await?;
    let status = resp.status().as_u16();
    let body = resp.text().await?;
    Ok(TransportResponse { status, body })
}

// ---------------------------------------------------------------------------
// Direct
// ---------------------------------------------------------------------------

pub struct DirectTransport {
    client: reqwest::Client,
}

impl DirectTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for DirectTransport {
    fn name(&self) -> &str {
        "direct"
    }

    fn host_for(&self, url: &str) -> String {
        host_of(url)
    }

    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> std::result::Result<TransportResponse, TransportError> {
        let url = reqwest::Url::parse(url).map_err(|e| TransportError::Request(e.to_string()))?;
        send(&self.client, url, headers).await
    }
}

// ---------------------------------------------------------------------------
// Proxied
// ---------------------------------------------------------------------------

/// Sends the target URL as a query parameter of a scraping proxy:
/// `{endpoint}?api_key={key}&url={target}`.
pub struct ProxiedTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ProxiedTransport {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    pub fn proxied_url(&self, target: &str) -> std::result::Result<reqwest::Url, TransportError> {
        reqwest::Url::parse_with_params(
            &self.endpoint,
            &[("api_key", self.api_key.as_str()), ("url", target)],
        )
        .map_err(|e| {
            TransportError::Request(format!("bad proxy endpoint: {e}"))
        })
    }
}

#[async_trait]
impl Transport for ProxiedTransport {
    fn name(&self) -> &str {
        "proxied"
    }

    fn host_for(&self, _url: &str) -> String {
        host_of(&self.endpoint)
    }

    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> std::result::Result<TransportResponse, TransportError> {
        let url = self.proxied_url(url)?;
        send(&self.client, url, headers).await
    }
}

/// Transport order for a run: proxied first when a credential is present,
/// then direct. A missing credential only drops the proxied leg.
pub fn transport_order(
    client: reqwest::Client,
    proxy_endpoint: &str,
    proxy_api_key: Option<&str>,
) -> Vec<Arc<dyn Transport>> {
    let mut order: Vec<Arc<dyn Transport>> = Vec::with_capacity(2);
    match proxy_api_key.filter(|k| !k.is_empty()) {
        Some(key) => {
            order.push(Arc::new(ProxiedTransport::new(
                client.clone(),
                proxy_endpoint,
                key,
            )));
        }
        None => {
            warn!("SCRAPERAPI_KEY not set, using direct requests only");
        }
    }
    order.push(Arc::new(DirectTransport::new(client)));
    order
}
