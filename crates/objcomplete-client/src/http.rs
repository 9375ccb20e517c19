use std::time::Duration;

use objcomplete_core::EndpointConfig;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{LookupError, Result};

// ─── Endpoint ─────────────────────────────────────────────────────────────────

/// The lookup URL, resolved against the location of the page hosting the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
    query_param: String,
}

impl Endpoint {
    /// Keep only the scheme, host and port of `page_location`, then append
    /// `base_path` and the endpoint name.
    pub fn resolve(page_location: &str, config: &EndpointConfig) -> Result<Self> {
        let page = Url::parse(page_location)
            .map_err(|e| LookupError::InvalidUrl(format!("{page_location}: {e}")))?;
        if page.cannot_be_a_base() || page.host_str().is_none() {
            return Err(LookupError::InvalidUrl(format!(
                "{page_location}: page location has no host"
            )));
        }
        if !matches!(page.scheme(), "http" | "https") {
            return Err(LookupError::InvalidUrl(format!(
                "{page_location}: unsupported scheme {}",
                page.scheme()
            )));
        }

        let base = config.base_path.trim_matches('/');
        let endpoint = config.endpoint.trim_matches('/');
        let path = if base.is_empty() {
            format!("/{endpoint}")
        } else {
            format!("/{base}/{endpoint}")
        };

        let mut url = page;
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);

        Ok(Self {
            url,
            query_param: config.query_param.clone(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The GET URL for one query, with `text` URL-encoded.
    pub fn query_url(&self, text: &str) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair(&self.query_param, text);
        url
    }
}

// ─── LookupClient ─────────────────────────────────────────────────────────────

/// Plain GET client. No retries: a new keystroke is the retry.
#[derive(Debug, Clone)]
pub struct LookupClient {
    client: reqwest::Client,
}

impl LookupClient {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .gzip(true)
            .build()?;
        Ok(Self { client })
    }

    pub fn from_config(config: &EndpointConfig) -> Result<Self> {
        Self::new(config.timeout(), &config.user_agent)
    }

    pub async fn get(&self, url: &Url) -> Result<String> {
        debug!(%url, "GET");
        let resp = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(LookupError::Status {
                url: url.to_string(),
                status,
                body,
            });
        }
        Ok(resp.text().await?)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let text = self.get(url).await?;
        serde_json::from_str(&text).map_err(|e| LookupError::Malformed(e.to_string()))
    }
}
