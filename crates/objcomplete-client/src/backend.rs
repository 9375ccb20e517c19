use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use objcomplete_core::{EndpointConfig, QueryKind, SuggestionItem};

use crate::error::Result;
use crate::http::{Endpoint, LookupClient};

/// One query the controller wants answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub id: RequestId,
    pub text: String,
    pub kind: Option<QueryKind>,
}

/// Monotonic identifier of an issued query. Later queries compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct BackendStatus {
    pub available: bool,
    pub latency_ms: Option<u64>,
    pub last_checked: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Whatever answers object lookups for the controller.
#[async_trait]
pub trait LookupBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn lookup(&self, query: &QueryRequest) -> Result<Vec<SuggestionItem>>;

    async fn health_check(&self) -> BackendStatus;
}

/// The `complete_object` HTTP endpoint.
pub struct HttpBackend {
    client: LookupClient,
    endpoint: Endpoint,
}

impl HttpBackend {
    pub fn new(client: LookupClient, endpoint: Endpoint) -> Self {
        Self { client, endpoint }
    }

    pub fn from_config(page_location: &str, config: &EndpointConfig) -> Result<Self> {
        Ok(Self::new(
            LookupClient::from_config(config)?,
            Endpoint::resolve(page_location, config)?,
        ))
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

#[async_trait]
impl LookupBackend for HttpBackend {
    fn name(&self) -> &str {
        self.endpoint.url().as_str()
    }

    async fn lookup(&self, query: &QueryRequest) -> Result<Vec<SuggestionItem>> {
        let url = self.endpoint.query_url(&query.text);
        self.client.get_json(&url).await
    }

    async fn health_check(&self) -> BackendStatus {
        let start = Instant::now();
        // Any syntactically valid answer, even an empty list, means the endpoint is up.
        let probe = self.endpoint.query_url("");
        let result = self.client.get_json::<Vec<SuggestionItem>>(&probe).await;
        BackendStatus {
            available: result.is_ok(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
            last_checked: Some(Utc::now()),
            error: result.err().map(|e| e.to_string()),
        }
    }
}

/// A backend pointed at a local port nobody listens on.
#[cfg(test)]
pub(crate) fn closed_port_backend() -> HttpBackend {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let config = EndpointConfig {
        timeout_ms: 2000,
        ..EndpointConfig::default()
    };
    HttpBackend::from_config(&format!("http://{addr}/"), &config).unwrap()
}
