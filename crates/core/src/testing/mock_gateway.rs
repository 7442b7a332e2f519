//! Mock gateway for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::gateway::{Category, Gateway, GatewayError, ImageSource, RemoteStatus, TopicBrief};

/// A recorded gateway call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Trait method name, e.g. `"poll_avatar_video"`.
    pub operation: &'static str,
    /// Stringified arguments in call order.
    pub args: Vec<String>,
    pub timestamp: chrono::DateTime<Utc>,
}

/// Scripted responses for each capability.
#[derive(Debug, Clone)]
struct Responses {
    topic: TopicBrief,
    script: String,
    audio: Vec<u8>,
    image: Vec<u8>,
    job_id: String,
    video: Vec<u8>,
}

impl Default for Responses {
    fn default() -> Self {
        Self {
            topic: TopicBrief {
                topic: "Technology News".to_string(),
                source_text: "A new chip was announced - It is fast.".to_string(),
            },
            script: "Here is the news.".to_string(),
            audio: b"ID3mock-audio".to_vec(),
            image: b"\xff\xd8\xffmock-image".to_vec(),
            job_id: "job-1".to_string(),
            video: b"mock-video".to_vec(),
        }
    }
}

/// Mock implementation of the Gateway trait.
///
/// Provides controllable behavior for testing:
/// - Record every call for assertions
/// - Play back queued render poll statuses
/// - Fail a specific operation once
/// - Delay a specific operation
///
/// # Example
///
/// ```rust,ignore
/// let gateway = MockGateway::new();
/// gateway.set_script("Scientists announced a breakthrough...").await;
/// gateway.queue_poll_statuses(vec![RemoteStatus::Pending, RemoteStatus::Pending]).await;
///
/// // ... run the pipeline ...
///
/// assert_eq!(gateway.call_count("poll_avatar_video").await, 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    responses: Arc<RwLock<Responses>>,
    /// Statuses returned by successive polls; `Pending` once drained.
    poll_statuses: Arc<RwLock<VecDeque<RemoteStatus>>>,
    /// One-shot failures keyed by operation name.
    errors: Arc<RwLock<HashMap<&'static str, GatewayError>>>,
    delays: Arc<RwLock<HashMap<&'static str, Duration>>>,
}

impl MockGateway {
    /// Create a new mock gateway with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_topic(&self, topic: &str, source_text: &str) {
        self.responses.write().await.topic = TopicBrief {
            topic: topic.to_string(),
            source_text: source_text.to_string(),
        };
    }

    pub async fn set_script(&self, script: &str) {
        self.responses.write().await.script = script.to_string();
    }

    pub async fn set_audio(&self, audio: Vec<u8>) {
        self.responses.write().await.audio = audio;
    }

    pub async fn set_image(&self, image: Vec<u8>) {
        self.responses.write().await.image = image;
    }

    pub async fn set_job_id(&self, job_id: &str) {
        self.responses.write().await.job_id = job_id.to_string();
    }

    pub async fn set_video(&self, video: Vec<u8>) {
        self.responses.write().await.video = video;
    }

    /// Queue statuses for successive `poll_avatar_video` calls.
    pub async fn queue_poll_statuses(&self, statuses: Vec<RemoteStatus>) {
        self.poll_statuses.write().await.extend(statuses);
    }

    /// Make the next call to `operation` fail with `error`.
    pub async fn fail_next(&self, operation: &'static str, error: GatewayError) {
        self.errors.write().await.insert(operation, error);
    }

    /// Sleep before answering every call to `operation`.
    pub async fn set_delay(&self, operation: &'static str, delay: Duration) {
        self.delays.write().await.insert(operation, delay);
    }

    /// Get all recorded calls.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Operation names in call order.
    pub async fn operations(&self) -> Vec<&'static str> {
        self.calls.read().await.iter().map(|c| c.operation).collect()
    }

    pub async fn call_count(&self, operation: &str) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Clear recorded calls.
    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    async fn record(&self, operation: &'static str, args: Vec<String>) -> Result<(), GatewayError> {
        self.calls.write().await.push(RecordedCall {
            operation,
            args,
            timestamp: Utc::now(),
        });

        let delay = self.delays.read().await.get(operation).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.errors.write().await.remove(operation) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn fetch_topic(&self, category: Category) -> Result<TopicBrief, GatewayError> {
        self.record("fetch_topic", vec![category.to_string()]).await?;
        Ok(self.responses.read().await.topic.clone())
    }

    async fn rephrase_as_script(
        &self,
        topic: &str,
        source_text: &str,
    ) -> Result<String, GatewayError> {
        self.record(
            "rephrase_as_script",
            vec![topic.to_string(), source_text.to_string()],
        )
        .await?;
        Ok(self.responses.read().await.script.clone())
    }

    async fn synthesize_speech(
        &self,
        script: &str,
        voice_id: &str,
    ) -> Result<Vec<u8>, GatewayError> {
        self.record(
            "synthesize_speech",
            vec![script.to_string(), voice_id.to_string()],
        )
        .await?;
        Ok(self.responses.read().await.audio.clone())
    }

    async fn fetch_image(
        &self,
        topic: &str,
        source: &ImageSource,
    ) -> Result<Vec<u8>, GatewayError> {
        self.record("fetch_image", vec![topic.to_string(), format!("{:?}", source)])
            .await?;
        Ok(self.responses.read().await.image.clone())
    }

    async fn request_avatar_video(&self, script: &str) -> Result<String, GatewayError> {
        self.record("request_avatar_video", vec![script.to_string()])
            .await?;
        Ok(self.responses.read().await.job_id.clone())
    }

    async fn poll_avatar_video(&self, job_id: &str) -> Result<RemoteStatus, GatewayError> {
        self.record("poll_avatar_video", vec![job_id.to_string()])
            .await?;
        Ok(self
            .poll_statuses
            .write()
            .await
            .pop_front()
            .unwrap_or(RemoteStatus::Pending))
    }

    async fn download_render(&self, location: &str) -> Result<Vec<u8>, GatewayError> {
        self.record("download_render", vec![location.to_string()])
            .await?;
        Ok(self.responses.read().await.video.clone())
    }
}
