//! Client for the Pebble API on the workload container's unix socket.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Method, Request};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use hyperlocal::UnixConnector;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::Supervisor;
use crate::error::{CharmError, Result};
use crate::layer::{Layer, Plan};

/// Default per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// How long to wait for a restart or replan change.
const CHANGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Pebble response envelope.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "status-code", default)]
    status_code: u16,
    #[serde(default)]
    change: Option<String>,
    #[serde(default)]
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChangeInfo {
    #[serde(default)]
    status: String,
    #[serde(default)]
    err: Option<String>,
}

/// Client for Pebble in the workload container.
pub struct PebbleClient {
    socket: PathBuf,
    client: Client<UnixConnector, Full<Bytes>>,
    request_timeout: Duration,
    change_timeout: Duration,
}

impl PebbleClient {
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self {
            socket: socket.into(),
            client: Client::builder(TokioExecutor::new()).build(UnixConnector),
            request_timeout: REQUEST_TIMEOUT,
            change_timeout: CHANGE_TIMEOUT,
        }
    }

    /// Socket path Juju mounts for a sidecar container.
    pub fn socket_for_container(container: &str) -> PathBuf {
        Path::new("/charm/containers")
            .join(container)
            .join("pebble.socket")
    }

    pub fn with_timeouts(mut self, request: Duration, change: Duration) -> Self {
        self.request_timeout = request;
        self.change_timeout = change;
        self
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        timeout: Duration,
    ) -> Result<Envelope> {
        debug!(method = %method, path, "Pebble request");

        let uri: hyper::Uri = hyperlocal::Uri::new(&self.socket, path).into();
        let payload = match body {
            Some(v) => Bytes::from(serde_json::to_vec(&v)?),
            None => Bytes::new(),
        };

        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Full::new(payload))
            .map_err(|e| CharmError::Http(e.to_string()))?;

        let exchange = async {
            let resp = self
                .client
                .request(req)
                .await
                .map_err(|e| CharmError::SupervisorUnreachable(e.to_string()))?;
            let status = resp.status().as_u16();
            let bytes = resp
                .into_body()
                .collect()
                .await
                .map_err(|e| CharmError::Http(e.to_string()))?
                .to_bytes();
            Ok::<_, CharmError>((status, bytes))
        };

        let (status, bytes) = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| {
                CharmError::SupervisorUnreachable(format!("timed out after {timeout:?}"))
            })??;

        let envelope: Envelope = serde_json::from_slice(&bytes)?;
        if envelope.kind == "error" || status >= 400 {
            let message = envelope
                .result
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string();
            return Err(CharmError::Pebble {
                status: if envelope.status_code != 0 {
                    envelope.status_code
                } else {
                    status
                },
                message,
            });
        }

        Ok(envelope)
    }

    /// Wait until an async change is done.
    async fn wait_change(&self, change_id: &str) -> Result<()> {
        let secs = self.change_timeout.as_secs().max(1);
        let path = format!("/v1/changes/{change_id}/wait?timeout={secs}s");
        // Leave Pebble room to answer its own timeout before ours fires.
        let envelope = self
            .request(
                Method::GET,
                &path,
                None,
                self.change_timeout + self.request_timeout,
            )
            .await?;

        let info: ChangeInfo = serde_json::from_value(envelope.result)?;
        match info.err {
            Some(err) if !err.is_empty() => Err(CharmError::Pebble {
                status: 200,
                message: format!("change {change_id} {}: {err}", info.status),
            }),
            _ => {
                debug!(change = change_id, status = %info.status, "Pebble change finished");
                Ok(())
            }
        }
    }

    async fn services_action(&self, action: &str, services: &[String]) -> Result<()> {
        let body = json!({ "action": action, "services": services });
        let envelope = self
            .request(Method::POST, "/v1/services", Some(body), self.request_timeout)
            .await?;

        match envelope.change {
            Some(id) => self.wait_change(&id).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Supervisor for PebbleClient {
    async fn can_connect(&self) -> bool {
        match self
            .request(Method::GET, "/v1/system-info", None, self.request_timeout)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                debug!(socket = %self.socket.display(), error = %e, "Pebble not reachable");
                false
            }
        }
    }

    async fn get_plan(&self) -> Result<Plan> {
        let envelope = self
            .request(Method::GET, "/v1/plan?format=yaml", None, self.request_timeout)
            .await?;
        let yaml = envelope.result.as_str().unwrap_or_default();
        Plan::from_yaml(yaml)
    }

    async fn add_layer(&self, label: &str, layer: &Layer, combine: bool) -> Result<()> {
        let body = json!({
            "action": "add",
            "label": label,
            "combine": combine,
            "format": "yaml",
            "layer": layer.to_yaml()?,
        });
        self.request(Method::POST, "/v1/layers", Some(body), self.request_timeout)
            .await?;
        info!(label, "Added Pebble layer");
        Ok(())
    }

    async fn restart(&self, services: &[String]) -> Result<()> {
        info!(services = ?services, "Restarting services");
        self.services_action("restart", services).await
    }

    async fn replan(&self) -> Result<()> {
        info!("Replanning");
        self.services_action("replan", &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_for_container() {
        assert_eq!(
            PebbleClient::socket_for_container("nessie"),
            PathBuf::from("/charm/containers/nessie/pebble.socket")
        );
    }

    #[test]
    fn test_envelope_parses_async_response() {
        let raw = r#"{"type":"async","status-code":202,"status":"Accepted","change":"42","result":null}"#;
        let env: Envelope = serde_json::from_str(raw).unwrap();
        assert_eq!(env.kind, "async");
        assert_eq!(env.status_code, 202);
        assert_eq!(env.change.as_deref(), Some("42"));
    }

    #[test]
    fn test_envelope_parses_plan() {
        let raw = r#"{"type":"sync","status-code":200,"status":"OK","result":"services:\n    nessie:\n        override: replace\n        command: /usr/local/s2i/run\n        startup: enabled\n"}"#;
        let env: Envelope = serde_json::from_str(raw).unwrap();
        let plan = Plan::from_yaml(env.result.as_str().unwrap()).unwrap();
        assert_eq!(plan.services["nessie"].command, "/usr/local/s2i/run");
    }

    #[tokio::test]
    async fn test_missing_socket_is_unreachable() {
        let client = PebbleClient::new("/nonexistent/pebble.socket")
            .with_timeouts(Duration::from_millis(500), Duration::from_secs(1));
        assert!(!client.can_connect().await);
        assert!(matches!(
            client.get_plan().await,
            Err(CharmError::SupervisorUnreachable(_))
        ));
    }
}
