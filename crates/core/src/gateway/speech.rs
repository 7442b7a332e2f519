//! Speech synthesizer (ElevenLabs text-to-speech).

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{build_client, ensure_success, read_bytes, GatewayError, Service};

const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";

/// Speech synthesizer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Sent in the `xi-api-key` header.
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl SpeechConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
}

/// Text-to-speech client.
pub struct SpeechClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SpeechClient {
    pub fn new(config: &SpeechConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            client: build_client(Service::Speech)?,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Synthesize the script with the given voice.
    ///
    /// Any 2xx response is success; the audio bytes are not inspected.
    pub async fn synthesize(&self, script: &str, voice_id: &str) -> Result<Vec<u8>, GatewayError> {
        let url = format!(
            "{}/v1/text-to-speech/{}",
            self.base_url,
            urlencoding::encode(voice_id)
        );

        debug!("Speech synthesis: voice={}, chars={}", voice_id, script.len());

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .json(&SpeechRequest { text: script })
            .send()
            .await
            .map_err(|e| GatewayError::transport(Service::Speech, e))?;

        let response = ensure_success(Service::Speech, response).await?;
        read_bytes(Service::Speech, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SpeechClient {
        SpeechClient::new(&SpeechConfig {
            api_key: "xi-test".to_string(),
            base_url: Some(server.uri()),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_synthesize_passes_bytes_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/voice-1"))
            .and(header("xi-api-key", "xi-test"))
            .and(body_json(serde_json::json!({"text": "Hello world"})))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x49, 0x44, 0x33]))
            .mount(&server)
            .await;

        let audio = client_for(&server)
            .synthesize("Hello world", "voice-1")
            .await
            .unwrap();
        assert_eq!(audio, vec![0x49, 0x44, 0x33]);
    }

    #[tokio::test]
    async fn test_synthesize_empty_body_is_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/voice-1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let audio = client_for(&server)
            .synthesize("Hello", "voice-1")
            .await
            .unwrap();
        assert!(audio.is_empty());
    }

    #[tokio::test]
    async fn test_synthesize_error_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/voice-1"))
            .respond_with(ResponseTemplate::new(401).set_body_string("{\"detail\":\"bad key\"}"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .synthesize("Hello", "voice-1")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "speech error: 401 - {\"detail\":\"bad key\"}");
    }
}
