//! Daily call budgets for the paid services.
//!
//! [`QuotaGateway`] wraps any [`Gateway`] and charges one call against the
//! service's budget before delegating. Counters reset when the local date
//! changes. A limit of 0 means unlimited.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

use super::types::{Category, ImageSource, RemoteStatus, TopicBrief};
use super::{Gateway, GatewayError, Service};
use crate::metrics;

/// Daily call limits per service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    #[serde(default = "default_script_limit")]
    pub script: u32,
    #[serde(default = "default_speech_limit")]
    pub speech: u32,
    #[serde(default = "default_images_limit")]
    pub images: u32,
}

fn default_script_limit() -> u32 {
    100
}

fn default_speech_limit() -> u32 {
    50
}

fn default_images_limit() -> u32 {
    50
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            script: default_script_limit(),
            speech: default_speech_limit(),
            images: default_images_limit(),
        }
    }
}

impl QuotaConfig {
    /// Limit for a service, or `None` when the service is not metered.
    pub fn limit_for(&self, service: Service) -> Option<u32> {
        match service {
            Service::Script => Some(self.script),
            Service::Speech => Some(self.speech),
            Service::Images => Some(self.images),
            Service::News | Service::Avatar => None,
        }
    }
}

/// Usage of one metered service for the current day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceUsage {
    pub service: Service,
    pub used: u32,
    /// 0 means unlimited.
    pub limit: u32,
    pub reset_date: NaiveDate,
}

#[derive(Debug)]
struct Counter {
    used: u32,
    reset_date: NaiveDate,
}

/// In-memory per-service call counters.
#[derive(Debug)]
pub struct UsageTracker {
    config: QuotaConfig,
    counters: Mutex<HashMap<Service, Counter>>,
}

impl UsageTracker {
    pub fn new(config: QuotaConfig) -> Self {
        Self {
            config,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Charge one call to `service` as of `today`.
    ///
    /// Fails without charging when the budget is already used up.
    pub async fn charge_on(&self, service: Service, today: NaiveDate) -> Result<(), GatewayError> {
        let Some(limit) = self.config.limit_for(service) else {
            return Ok(());
        };

        let mut counters = self.counters.lock().await;
        let counter = counters.entry(service).or_insert(Counter {
            used: 0,
            reset_date: today,
        });

        if counter.reset_date != today {
            counter.used = 0;
            counter.reset_date = today;
        }

        if limit > 0 && counter.used >= limit {
            warn!("{} daily limit reached ({} calls)", service, limit);
            metrics::QUOTA_REJECTIONS
                .with_label_values(&[service.as_str()])
                .inc();
            return Err(GatewayError::QuotaExceeded { service, limit });
        }

        counter.used += 1;
        Ok(())
    }

    pub async fn charge(&self, service: Service) -> Result<(), GatewayError> {
        self.charge_on(service, Local::now().date_naive()).await
    }

    /// Snapshot of today's usage for every metered service.
    pub async fn usage_on(&self, today: NaiveDate) -> Vec<ServiceUsage> {
        let counters = self.counters.lock().await;
        [Service::Script, Service::Speech, Service::Images]
            .into_iter()
            .map(|service| {
                let used = counters
                    .get(&service)
                    .filter(|c| c.reset_date == today)
                    .map(|c| c.used)
                    .unwrap_or(0);
                ServiceUsage {
                    service,
                    used,
                    limit: self.config.limit_for(service).unwrap_or(0),
                    reset_date: today,
                }
            })
            .collect()
    }

    pub async fn usage(&self) -> Vec<ServiceUsage> {
        self.usage_on(Local::now().date_naive()).await
    }
}

/// A [`Gateway`] that enforces daily call budgets on the inner gateway.
pub struct QuotaGateway<G> {
    inner: G,
    tracker: Arc<UsageTracker>,
}

impl<G: Gateway> QuotaGateway<G> {
    pub fn new(inner: G, config: QuotaConfig) -> Self {
        Self {
            inner,
            tracker: Arc::new(UsageTracker::new(config)),
        }
    }

    /// Shared handle for reporting usage while the gateway is in use.
    pub fn tracker(&self) -> Arc<UsageTracker> {
        Arc::clone(&self.tracker)
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

#[async_trait]
impl<G: Gateway> Gateway for QuotaGateway<G> {
    async fn fetch_topic(&self, category: Category) -> Result<TopicBrief, GatewayError> {
        self.inner.fetch_topic(category).await
    }

    async fn rephrase_as_script(
        &self,
        topic: &str,
        source_text: &str,
    ) -> Result<String, GatewayError> {
        self.tracker.charge(Service::Script).await?;
        self.inner.rephrase_as_script(topic, source_text).await
    }

    async fn synthesize_speech(
        &self,
        script: &str,
        voice_id: &str,
    ) -> Result<Vec<u8>, GatewayError> {
        self.tracker.charge(Service::Speech).await?;
        self.inner.synthesize_speech(script, voice_id).await
    }

    async fn fetch_image(
        &self,
        topic: &str,
        source: &ImageSource,
    ) -> Result<Vec<u8>, GatewayError> {
        // Local uploads and placeholders cost nothing.
        if matches!(source, ImageSource::StockPhoto) {
            self.tracker.charge(Service::Images).await?;
        }
        self.inner.fetch_image(topic, source).await
    }

    async fn request_avatar_video(&self, script: &str) -> Result<String, GatewayError> {
        self.inner.request_avatar_video(script).await
    }

    async fn poll_avatar_video(&self, job_id: &str) -> Result<RemoteStatus, GatewayError> {
        self.inner.poll_avatar_video(job_id).await
    }

    async fn download_render(&self, location: &str) -> Result<Vec<u8>, GatewayError> {
        self.inner.download_render(location).await
    }
}
