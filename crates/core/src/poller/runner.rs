//! Drives a render job from submission to a terminal outcome.

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::PollerConfig;
use super::state::{PollState, RenderJob};
use crate::gateway::{Gateway, GatewayError};
use crate::metrics;

/// Ways a render can end without a video.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Submission, a poll, or the download failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The renderer reported `error` or `rejected`.
    #[error("video render {job_id} failed: {reason}")]
    Failed { job_id: String, reason: String },

    /// Every poll reported pending. The job may still finish remotely.
    #[error("video render {job_id} still processing after {attempts} polls")]
    Timeout { job_id: String, attempts: u32 },

    #[error("video render {job_id} cancelled after {attempts} polls")]
    Cancelled { job_id: String, attempts: u32 },
}

/// Bounded fixed-interval poller for avatar renders.
#[derive(Debug, Clone)]
pub struct JobPoller {
    config: PollerConfig,
}

impl JobPoller {
    pub fn new(config: PollerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Submit `script` for rendering and wait for the video.
    ///
    /// Submission is attempted once. `cancel` is checked before every poll
    /// and interrupts the inter-poll sleep.
    pub async fn render_and_wait(
        &self,
        gateway: &dyn Gateway,
        script: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, RenderError> {
        let job_id = gateway.request_avatar_video(script).await?;
        info!("Render submitted: job_id={}", job_id);

        let state = match self.poll_until_terminal(gateway, job_id, cancel).await {
            Ok(state) => state,
            Err(e) => {
                metrics::RENDER_OUTCOMES.with_label_values(&["error"]).inc();
                return Err(e.into());
            }
        };

        metrics::RENDER_OUTCOMES
            .with_label_values(&[state.outcome()])
            .inc();
        debug!(
            "Render {} finished polling: {} ({} polls)",
            state.job().job_id,
            state.outcome(),
            state.job().attempt
        );

        match state {
            PollState::Completed { job, location } => {
                info!(
                    "Render {} completed after {} polls, downloading",
                    job.job_id, job.attempt
                );
                Ok(gateway.download_render(&location).await?)
            }
            PollState::Failed { job, reason } => {
                warn!("Render {} failed: {}", job.job_id, reason);
                Err(RenderError::Failed {
                    job_id: job.job_id,
                    reason,
                })
            }
            PollState::TimedOut { job } => {
                warn!("Render {} timed out after {} polls", job.job_id, job.attempt);
                Err(RenderError::Timeout {
                    job_id: job.job_id,
                    attempts: job.attempt,
                })
            }
            PollState::Cancelled { job } | PollState::Polling(job) => {
                info!("Render {} cancelled after {} polls", job.job_id, job.attempt);
                Err(RenderError::Cancelled {
                    job_id: job.job_id,
                    attempts: job.attempt,
                })
            }
        }
    }

    async fn poll_until_terminal(
        &self,
        gateway: &dyn Gateway,
        job_id: String,
        cancel: &CancellationToken,
    ) -> Result<PollState, GatewayError> {
        let mut state = PollState::Polling(RenderJob::new(job_id));

        while !state.is_terminal() {
            let job = state.job().clone();

            if job.attempt > 0 {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.config.interval()) => {}
                }
            }

            if cancel.is_cancelled() {
                state = job.cancel();
                continue;
            }

            let status = gateway.poll_avatar_video(&job.job_id).await?;
            metrics::RENDER_POLLS.inc();
            debug!(
                "Render {} poll {}/{}: {}",
                job.job_id,
                job.attempt + 1,
                self.config.max_attempts,
                status.label()
            );

            state = job.observe(status, self.config.max_attempts);
        }

        Ok(state)
    }
}
