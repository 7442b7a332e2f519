//! External service gateway.
//!
//! Every remote capability the pipeline needs (topic source, script
//! rephraser, speech synthesizer, image source, avatar-video renderer) is
//! reached through the [`Gateway`] trait: one semantic request becomes one
//! outbound call and one parsed result. Implementations hold no run state.

mod avatar;
mod http;
mod images;
mod news;
mod quota;
mod script;
mod speech;
mod types;

pub use avatar::{AvatarClient, AvatarConfig};
pub use http::HttpGateway;
pub use images::{ImageClient, ImagesConfig};
pub use news::{NewsClient, NewsConfig};
pub use quota::{QuotaConfig, QuotaGateway, ServiceUsage, UsageTracker};
pub use script::{ScriptClient, ScriptConfig, SCRIPT_INSTRUCTIONS};
pub use speech::{SpeechClient, SpeechConfig};
pub use types::*;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Timeout applied to every outbound request.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// The remote capability a call was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    News,
    Script,
    Speech,
    Images,
    Avatar,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::News => "news",
            Service::Script => "script",
            Service::Speech => "speech",
            Service::Images => "images",
            Service::Avatar => "avatar",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur when calling an external service.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network or connection failure; no response was received.
    #[error("{service} request failed: {message}")]
    Transport { service: Service, message: String },

    /// The service answered with a non-success status, or a success status
    /// without the data the call requires.
    #[error("{service} error: {status} - {body}")]
    Service {
        service: Service,
        status: u16,
        body: String,
    },

    /// The response body could not be decoded.
    #[error("{service} returned an unreadable response: {message}")]
    Parse { service: Service, message: String },

    /// The daily call budget for this service is used up.
    #[error("{service} daily limit reached ({limit} calls)")]
    QuotaExceeded { service: Service, limit: u32 },

    /// A local input file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GatewayError {
    pub(crate) fn transport(service: Service, err: reqwest::Error) -> Self {
        GatewayError::Transport {
            service,
            message: err.to_string(),
        }
    }

    pub(crate) fn parse(service: Service, message: impl fmt::Display) -> Self {
        GatewayError::Parse {
            service,
            message: message.to_string(),
        }
    }

    /// The service this error came from, if any.
    pub fn service(&self) -> Option<Service> {
        match self {
            GatewayError::Transport { service, .. }
            | GatewayError::Service { service, .. }
            | GatewayError::Parse { service, .. }
            | GatewayError::QuotaExceeded { service, .. } => Some(*service),
            GatewayError::Io { .. } => None,
        }
    }
}

/// Uniform call surface over every remote capability.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Fetch a trending topic and its source text for a category.
    ///
    /// An empty result from the news source yields
    /// [`TopicBrief::fallback`] instead of an error.
    async fn fetch_topic(&self, category: Category) -> Result<TopicBrief, GatewayError>;

    /// Rewrite source text as a short spoken script. Returns trimmed,
    /// non-empty text.
    async fn rephrase_as_script(
        &self,
        topic: &str,
        source_text: &str,
    ) -> Result<String, GatewayError>;

    /// Synthesize speech audio. Bytes are passed through unvalidated.
    async fn synthesize_speech(&self, script: &str, voice_id: &str)
        -> Result<Vec<u8>, GatewayError>;

    /// Obtain a still image for the topic.
    async fn fetch_image(&self, topic: &str, source: &ImageSource)
        -> Result<Vec<u8>, GatewayError>;

    /// Submit an avatar-video render and return the remote job id.
    async fn request_avatar_video(&self, script: &str) -> Result<String, GatewayError>;

    /// Poll a render job once.
    async fn poll_avatar_video(&self, job_id: &str) -> Result<RemoteStatus, GatewayError>;

    /// Download the finished render from its result location.
    async fn download_render(&self, location: &str) -> Result<Vec<u8>, GatewayError>;
}

/// Pass successful responses through; turn anything else into
/// [`GatewayError::Service`] carrying the response body.
pub(crate) async fn ensure_success(
    service: Service,
    response: reqwest::Response,
) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Service {
        service,
        status: status.as_u16(),
        body,
    })
}

/// Read a full response body as bytes.
pub(crate) async fn read_bytes(
    service: Service,
    response: reqwest::Response,
) -> Result<Vec<u8>, GatewayError> {
    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| GatewayError::transport(service, e))
}

/// Build the shared HTTP client.
pub(crate) fn build_client(service: Service) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| GatewayError::transport(service, e))
}
