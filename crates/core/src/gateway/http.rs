//! Production gateway: one HTTP client per remote service.

use std::future::Future;
use std::time::Instant;

use async_trait::async_trait;

use super::types::{Category, ImageSource, RemoteStatus, TopicBrief};
use super::{
    AvatarClient, Gateway, GatewayError, ImageClient, NewsClient, ScriptClient, Service,
    SpeechClient,
};
use crate::config::ServicesConfig;
use crate::metrics;

/// Gateway that delegates each capability to its vendor client.
pub struct HttpGateway {
    news: NewsClient,
    script: ScriptClient,
    speech: SpeechClient,
    images: ImageClient,
    avatar: AvatarClient,
}

impl HttpGateway {
    pub fn new(
        news: NewsClient,
        script: ScriptClient,
        speech: SpeechClient,
        images: ImageClient,
        avatar: AvatarClient,
    ) -> Self {
        Self {
            news,
            script,
            speech,
            images,
            avatar,
        }
    }

    /// Build every client from configuration.
    pub fn from_config(config: &ServicesConfig) -> Result<Self, GatewayError> {
        Ok(Self::new(
            NewsClient::new(&config.news)?,
            ScriptClient::new(&config.script)?,
            SpeechClient::new(&config.speech)?,
            ImageClient::new(&config.images)?,
            AvatarClient::new(&config.avatar)?,
        ))
    }
}

/// Run one outbound call and record its duration and outcome.
async fn observed<T, F>(service: Service, operation: &str, call: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    let start = Instant::now();
    let result = call.await;

    metrics::EXTERNAL_SERVICE_DURATION
        .with_label_values(&[service.as_str(), operation])
        .observe(start.elapsed().as_secs_f64());
    metrics::EXTERNAL_SERVICE_REQUESTS
        .with_label_values(&[
            service.as_str(),
            operation,
            if result.is_ok() { "success" } else { "error" },
        ])
        .inc();

    result
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn fetch_topic(&self, category: Category) -> Result<TopicBrief, GatewayError> {
        observed(Service::News, "fetch_topic", self.news.fetch_topic(category)).await
    }

    async fn rephrase_as_script(
        &self,
        topic: &str,
        source_text: &str,
    ) -> Result<String, GatewayError> {
        observed(
            Service::Script,
            "rephrase",
            self.script.rephrase(topic, source_text),
        )
        .await
    }

    async fn synthesize_speech(
        &self,
        script: &str,
        voice_id: &str,
    ) -> Result<Vec<u8>, GatewayError> {
        observed(
            Service::Speech,
            "synthesize",
            self.speech.synthesize(script, voice_id),
        )
        .await
    }

    async fn fetch_image(
        &self,
        topic: &str,
        source: &ImageSource,
    ) -> Result<Vec<u8>, GatewayError> {
        observed(Service::Images, "fetch", self.images.fetch(topic, source)).await
    }

    async fn request_avatar_video(&self, script: &str) -> Result<String, GatewayError> {
        observed(Service::Avatar, "submit", self.avatar.submit(script)).await
    }

    async fn poll_avatar_video(&self, job_id: &str) -> Result<RemoteStatus, GatewayError> {
        observed(Service::Avatar, "poll", self.avatar.status(job_id)).await
    }

    async fn download_render(&self, location: &str) -> Result<Vec<u8>, GatewayError> {
        observed(Service::Avatar, "download", self.avatar.download(location)).await
    }
}
