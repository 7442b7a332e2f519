//! Avatar-video renderer (D-ID talks API).

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::types::RemoteStatus;
use super::{build_client, ensure_success, read_bytes, GatewayError, Service};

const DEFAULT_BASE_URL: &str = "https://api.d-id.com";

/// Avatar renderer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarConfig {
    /// Sent as `Authorization: Basic <api_key>`.
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Presenter used for every render.
    #[serde(default = "default_presenter_id")]
    pub presenter_id: String,
}

fn default_presenter_id() -> String {
    "rian-lZC6MmWfC6".to_string()
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            presenter_id: default_presenter_id(),
        }
    }
}

impl AvatarConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }
}

#[derive(Debug, Serialize)]
struct TalkRequest<'a> {
    script: TalkScript<'a>,
    presenter_id: &'a str,
    config: TalkOptions,
}

#[derive(Debug, Serialize)]
struct TalkScript<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    input: &'a str,
}

#[derive(Debug, Serialize)]
struct TalkOptions {
    stitch: bool,
}

#[derive(Debug, Deserialize)]
struct TalkCreated {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TalkStatus {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    result_url: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

impl TalkStatus {
    fn into_remote_status(self) -> Result<RemoteStatus, GatewayError> {
        match self.status.as_deref() {
            Some("done") => match self.result_url {
                Some(location) if !location.is_empty() => Ok(RemoteStatus::Done {
                    result_location: location,
                }),
                _ => Err(GatewayError::Service {
                    service: Service::Avatar,
                    status: 200,
                    body: "render finished without a result location".to_string(),
                }),
            },
            Some("error") => Ok(RemoteStatus::Error {
                reason: error_reason(self.error),
            }),
            Some("rejected") => Ok(RemoteStatus::Rejected {
                reason: error_reason(self.error),
            }),
            // created, started, or anything else the renderer invents
            _ => Ok(RemoteStatus::Pending),
        }
    }
}

fn error_reason(error: Option<Value>) -> String {
    match error {
        None | Some(Value::Null) => "Unknown error".to_string(),
        Some(Value::String(s)) => s,
        Some(Value::Object(map)) => match map.get("description").and_then(Value::as_str) {
            Some(desc) => desc.to_string(),
            None => Value::Object(map).to_string(),
        },
        Some(other) => other.to_string(),
    }
}

/// Avatar render client.
pub struct AvatarClient {
    client: Client,
    base_url: String,
    api_key: String,
    presenter_id: String,
}

impl AvatarClient {
    pub fn new(config: &AvatarConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            client: build_client(Service::Avatar)?,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            presenter_id: config.presenter_id.clone(),
        })
    }

    fn auth_header(&self) -> String {
        format!("Basic {}", self.api_key)
    }

    /// Submit a render; returns the remote job id.
    pub async fn submit(&self, script: &str) -> Result<String, GatewayError> {
        let body = TalkRequest {
            script: TalkScript {
                kind: "text",
                input: script,
            },
            presenter_id: &self.presenter_id,
            config: TalkOptions { stitch: true },
        };

        let response = self
            .client
            .post(format!("{}/talks", self.base_url))
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::transport(Service::Avatar, e))?;

        let response = ensure_success(Service::Avatar, response).await?;
        let status = response.status().as_u16();

        let created: TalkCreated = response
            .json()
            .await
            .map_err(|e| GatewayError::parse(Service::Avatar, e))?;

        match created.id {
            Some(id) if !id.is_empty() => {
                debug!("Avatar render submitted: job_id={}", id);
                Ok(id)
            }
            _ => Err(GatewayError::Service {
                service: Service::Avatar,
                status,
                body: "response did not include a job id".to_string(),
            }),
        }
    }

    /// Query a render job once.
    pub async fn status(&self, job_id: &str) -> Result<RemoteStatus, GatewayError> {
        let response = self
            .client
            .get(format!(
                "{}/talks/{}",
                self.base_url,
                urlencoding::encode(job_id)
            ))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| GatewayError::transport(Service::Avatar, e))?;

        let response = ensure_success(Service::Avatar, response).await?;

        let status: TalkStatus = response
            .json()
            .await
            .map_err(|e| GatewayError::parse(Service::Avatar, e))?;

        status.into_remote_status()
    }

    /// Fetch the finished video. Result locations are pre-signed, so no
    /// auth header is sent.
    pub async fn download(&self, location: &str) -> Result<Vec<u8>, GatewayError> {
        let response = self
            .client
            .get(location)
            .send()
            .await
            .map_err(|e| GatewayError::transport(Service::Avatar, e))?;

        let response = ensure_success(Service::Avatar, response).await?;
        read_bytes(Service::Avatar, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AvatarClient {
        AvatarClient::new(&AvatarConfig {
            api_key: "did-key".to_string(),
            base_url: Some(server.uri()),
            presenter_id: "presenter-1".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_unknown_status_is_pending() {
        for raw in ["created", "started", "mystery"] {
            let status = TalkStatus {
                status: Some(raw.to_string()),
                result_url: None,
                error: None,
            };
            assert_eq!(status.into_remote_status().unwrap(), RemoteStatus::Pending);
        }
    }

    #[test]
    fn test_error_reason_shapes() {
        assert_eq!(error_reason(None), "Unknown error");
        assert_eq!(error_reason(Some(json!("boom"))), "boom");
        assert_eq!(
            error_reason(Some(json!({"kind": "X", "description": "bad face"}))),
            "bad face"
        );
        assert_eq!(error_reason(Some(json!({"kind": "X"}))), "{\"kind\":\"X\"}");
    }

    #[test]
    fn test_done_without_location_is_error() {
        let status = TalkStatus {
            status: Some("done".to_string()),
            result_url: None,
            error: None,
        };
        assert!(matches!(
            status.into_remote_status(),
            Err(GatewayError::Service { .. })
        ));
    }

    #[tokio::test]
    async fn test_submit_returns_job_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/talks"))
            .and(header("Authorization", "Basic did-key"))
            .and(body_partial_json(json!({
                "script": {"type": "text", "input": "Hello there."},
                "presenter_id": "presenter-1",
                "config": {"stitch": true}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "tlk_1"})))
            .mount(&server)
            .await;

        let id = client_for(&server).submit("Hello there.").await.unwrap();
        assert_eq!(id, "tlk_1");
    }

    #[tokio::test]
    async fn test_submit_without_id_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/talks"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"kind": "x"})))
            .mount(&server)
            .await;

        let err = client_for(&server).submit("Hi").await.unwrap_err();
        assert!(matches!(err, GatewayError::Service { status: 201, .. }));
    }

    #[tokio::test]
    async fn test_status_done() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/talks/tlk_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "done",
                "result_url": "https://cdn.example/v.mp4"
            })))
            .mount(&server)
            .await;

        let status = client_for(&server).status("tlk_1").await.unwrap();
        assert_eq!(
            status,
            RemoteStatus::Done {
                result_location: "https://cdn.example/v.mp4".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_status_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/talks/tlk_2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "rejected",
                "error": {"description": "content policy"}
            })))
            .mount(&server)
            .await;

        let status = client_for(&server).status("tlk_2").await.unwrap();
        assert_eq!(
            status,
            RemoteStatus::Rejected {
                reason: "content policy".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/results/v.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4data".to_vec()))
            .mount(&server)
            .await;

        let bytes = client_for(&server)
            .download(&format!("{}/results/v.mp4", server.uri()))
            .await
            .unwrap();
        assert_eq!(bytes, b"mp4data");
    }
}
