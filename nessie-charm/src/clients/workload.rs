//! Version probe against the Nessie REST API.

use std::time::Duration;

use async_trait::async_trait;
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::{Method, Request};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::Deserialize;
use tracing::debug;

use super::VersionProbe;
use crate::error::{CharmError, Result};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Subset of `GET /api/v2/config`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerConfig {
    #[serde(default)]
    spec_version: Option<String>,
}

/// Reads the version from the workload over HTTP.
pub struct HttpVersionProbe {
    host: String,
    timeout: Duration,
    client: Client<HttpConnector, Empty<Bytes>>,
}

impl HttpVersionProbe {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            timeout: PROBE_TIMEOUT,
            client: Client::builder(TokioExecutor::new()).build_http(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn fetch(&self, port: u16) -> Result<String> {
        let uri = format!("http://{}:{}/api/v2/config", self.host, port);
        let req = Request::builder()
            .method(Method::GET)
            .uri(&uri)
            .body(Empty::new())
            .map_err(|e| CharmError::VersionProbe(e.to_string()))?;

        let resp = self
            .client
            .request(req)
            .await
            .map_err(|e| CharmError::VersionProbe(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(CharmError::VersionProbe(format!(
                "{uri} returned {}",
                resp.status()
            )));
        }

        let bytes = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| CharmError::VersionProbe(e.to_string()))?
            .to_bytes();
        let config: ServerConfig = serde_json::from_slice(&bytes)?;

        debug!(version = ?config.spec_version, "Workload version");
        Ok(config.spec_version.unwrap_or_default())
    }
}

#[async_trait]
impl VersionProbe for HttpVersionProbe {
    async fn version(&self, port: u16) -> Result<String> {
        tokio::time::timeout(self.timeout, self.fetch(port))
            .await
            .map_err(|_| {
                CharmError::VersionProbe(format!("timed out after {:?}", self.timeout))
            })?
    }
}
