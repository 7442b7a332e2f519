//! Run orchestrator implementation.
//!
//! One background task executes a run stage by stage. Observers read an
//! immutable [`RunSnapshot`] published through a watch channel after every
//! transition, and may request cancellation at any time. Cancellation is
//! checked between stages and between render polls.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::gateway::{Gateway, TopicBrief};
use crate::metrics;
use crate::poller::{JobPoller, RenderError};
use crate::storage::{ArtifactKind, ArtifactStore, RunLayout};

use super::config::PipelineConfig;
use super::types::{OrchestratorError, RunRequest, RunSnapshot, RunStatus, Stage};

/// The run currently holding the single execution slot.
struct ActiveRun {
    run_id: Uuid,
    cancel: CancellationToken,
}

struct Shared {
    gateway: Arc<dyn Gateway>,
    poller: JobPoller,
    store: ArtifactStore,
    config: PipelineConfig,
    progress: watch::Sender<RunSnapshot>,
    active: Mutex<Option<ActiveRun>>,
}

impl Shared {
    fn active(&self) -> MutexGuard<'_, Option<ActiveRun>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, run: &Run) {
        self.progress.send_replace(run.snapshot.clone());
    }
}

/// How a run that did not fail came to an end.
enum Outcome {
    Done,
    Cancelled,
}

/// Worker-owned state of the run in progress.
struct Run {
    snapshot: RunSnapshot,
    started: Instant,
    stage_started: Instant,
}

impl Run {
    fn new(run_id: Uuid, topic: &str) -> Self {
        let now = Instant::now();
        Self {
            snapshot: RunSnapshot {
                run_id: Some(run_id),
                topic: topic.to_string(),
                started_at: Some(Utc::now()),
                finished_at: None,
                stage: Stage::FetchingTopic,
                status: RunStatus::Running,
                status_message: "Fetching trending topic...".to_string(),
                artifacts: Default::default(),
            },
            started: now,
            stage_started: now,
        }
    }

    fn close_stage(&mut self) {
        let stage = self.snapshot.stage;
        if !stage.is_terminal() && stage != Stage::Idle {
            metrics::STAGE_DURATION
                .with_label_values(&[stage.as_str()])
                .observe(self.stage_started.elapsed().as_secs_f64());
        }
        self.stage_started = Instant::now();
    }

    fn enter(&mut self, stage: Stage, message: impl Into<String>) {
        self.close_stage();
        info!("Run {}: entering {}", self.id(), stage);
        self.snapshot.stage = stage;
        self.snapshot.status_message = message.into();
    }

    fn id(&self) -> String {
        self.snapshot
            .run_id
            .map(|id| id.to_string())
            .unwrap_or_default()
    }
}

/// Drives pipeline runs, one at a time.
#[derive(Clone)]
pub struct RunOrchestrator {
    shared: Arc<Shared>,
}

impl RunOrchestrator {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        config: PipelineConfig,
        poller: JobPoller,
        store: ArtifactStore,
    ) -> Self {
        let (progress, _) = watch::channel(RunSnapshot::idle());
        Self {
            shared: Arc::new(Shared {
                gateway,
                poller,
                store,
                config,
                progress,
                active: Mutex::new(None),
            }),
        }
    }

    /// Build from the pipeline, poller and output sections of `config`.
    pub fn from_config(gateway: Arc<dyn Gateway>, config: &Config) -> Self {
        Self::new(
            gateway,
            config.pipeline.clone(),
            JobPoller::new(config.poller.clone()),
            ArtifactStore::new(config.output.root.clone()),
        )
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.shared.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.shared.store
    }

    /// Start a run in the background.
    ///
    /// Returns the initial snapshot, or [`OrchestratorError::AlreadyRunning`]
    /// without touching the active run. Must be called within a Tokio
    /// runtime.
    pub fn start_run(&self, request: RunRequest) -> Result<RunSnapshot, OrchestratorError> {
        let mut active = self.shared.active();
        if active.is_some() {
            metrics::RUNS_REJECTED.inc();
            warn!("Run rejected: another run is in progress");
            return Err(OrchestratorError::AlreadyRunning);
        }

        let run_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let run = Run::new(run_id, request.topic_override().unwrap_or_default());
        let snapshot = run.snapshot.clone();

        *active = Some(ActiveRun {
            run_id,
            cancel: cancel.clone(),
        });
        self.shared.progress.send_replace(snapshot.clone());
        drop(active);

        info!("Run {} started (topic: {:?})", run_id, request.topic_override());

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            Self::run_to_completion(shared, run, request, cancel).await;
        });

        Ok(snapshot)
    }

    /// Ask the active run to stop at its next checkpoint.
    ///
    /// Returns whether a run was active. Idempotent.
    pub fn request_cancel(&self) -> bool {
        match self.shared.active().as_ref() {
            Some(active) => {
                if !active.cancel.is_cancelled() {
                    info!("Cancellation requested for run {}", active.run_id);
                }
                active.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Latest published snapshot. Never blocks on the worker.
    pub fn read_progress(&self) -> RunSnapshot {
        self.shared.progress.borrow().clone()
    }

    /// Receiver that is notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.shared.progress.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.shared.active().is_some()
    }

    async fn run_to_completion(
        shared: Arc<Shared>,
        mut run: Run,
        request: RunRequest,
        cancel: CancellationToken,
    ) {
        let result = AssertUnwindSafe(Self::execute(&shared, &mut run, &request, &cancel))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(OrchestratorError::Panicked(panic_message(panic))));

        let (stage, status, message) = match result {
            Ok(Outcome::Done) => (
                Stage::Done,
                RunStatus::Done,
                format!(
                    "News report assets for '{}' stored successfully.",
                    run.snapshot.topic
                ),
            ),
            Ok(Outcome::Cancelled)
            | Err(OrchestratorError::Render(RenderError::Cancelled { .. })) => (
                Stage::Cancelled,
                RunStatus::Cancelled,
                format!("Run cancelled during {}.", run.snapshot.stage),
            ),
            Err(e) => {
                error!("Run {} failed during {}: {}", run.id(), run.snapshot.stage, e);
                (Stage::Error, RunStatus::Error, format!("Error: {}", e))
            }
        };

        run.close_stage();
        metrics::RUNS_TOTAL
            .with_label_values(&[status.as_str()])
            .inc();
        metrics::RUN_DURATION
            .with_label_values(&[status.as_str()])
            .observe(run.started.elapsed().as_secs_f64());

        info!("Run {} finished: {}", run.id(), status);

        // Publish and release the slot together so a new run cannot start
        // before the terminal snapshot is visible.
        let mut active = shared.active();
        run.snapshot.stage = stage;
        run.snapshot.status = status;
        run.snapshot.status_message = message;
        run.snapshot.finished_at = Some(Utc::now());
        shared.progress.send_replace(run.snapshot.clone());
        *active = None;
    }

    async fn execute(
        shared: &Shared,
        run: &mut Run,
        request: &RunRequest,
        cancel: &CancellationToken,
    ) -> Result<Outcome, OrchestratorError> {
        if cancel.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }

        // Topic
        let brief = match request.topic_override() {
            Some(topic) => TopicBrief::manual(topic),
            None => {
                let category = request.category.unwrap_or(shared.config.category);
                shared.gateway.fetch_topic(category).await?
            }
        };
        run.snapshot.topic = brief.topic.clone();
        run.snapshot.status_message = format!("Found news for topic: {}", brief.topic);
        shared.publish(run);

        if cancel.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }

        let started_at = run.snapshot.started_at.unwrap_or_else(Utc::now);
        let layout = shared.store.layout(&brief.topic, started_at);

        // Script
        run.enter(Stage::Scripting, "Rephrasing as news anchor script...");
        shared.publish(run);
        let script = shared
            .gateway
            .rephrase_as_script(&brief.topic, &brief.source_text)
            .await?;
        let path = shared
            .store
            .write(&layout, ArtifactKind::Script, script.as_bytes())
            .await?;
        Self::record(run, ArtifactKind::Script, path);
        shared.publish(run);

        if cancel.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }

        // Audio
        if shared.config.synthesize_audio {
            run.enter(Stage::SynthesizingAudio, "Generating speech audio...");
            shared.publish(run);
            let audio = shared
                .gateway
                .synthesize_speech(&script, &shared.config.voice_id)
                .await?;
            let path = shared.store.write(&layout, ArtifactKind::Audio, &audio).await?;
            Self::record(run, ArtifactKind::Audio, path);
            shared.publish(run);

            if cancel.is_cancelled() {
                return Ok(Outcome::Cancelled);
            }
        }

        // Image
        if shared.config.fetch_image {
            run.enter(Stage::FetchingImage, "Fetching image...");
            shared.publish(run);
            Self::fetch_image(shared, run, request, &layout, &brief.topic).await;
            shared.publish(run);

            if cancel.is_cancelled() {
                return Ok(Outcome::Cancelled);
            }
        }

        // Video
        run.enter(
            Stage::RenderingVideo,
            "Generating avatar video (this may take a few minutes)...",
        );
        shared.publish(run);
        let video = shared
            .poller
            .render_and_wait(shared.gateway.as_ref(), &script, cancel)
            .await?;
        let path = shared.store.write(&layout, ArtifactKind::Video, &video).await?;
        Self::record(run, ArtifactKind::Video, path);

        Ok(Outcome::Done)
    }

    /// The image is decorative: any failure is logged and skipped.
    async fn fetch_image(
        shared: &Shared,
        run: &mut Run,
        request: &RunRequest,
        layout: &RunLayout,
        topic: &str,
    ) {
        let source = request
            .image_source
            .clone()
            .unwrap_or_else(|| shared.config.image_source());

        let stored = match shared.gateway.fetch_image(topic, &source).await {
            Ok(bytes) => shared
                .store
                .write(layout, ArtifactKind::Image, &bytes)
                .await
                .map_err(OrchestratorError::from),
            Err(e) => Err(e.into()),
        };

        match stored {
            Ok(path) => Self::record(run, ArtifactKind::Image, path),
            Err(e) => {
                warn!("Run {}: image skipped: {}", run.id(), e);
                run.snapshot.status_message = format!("Image skipped: {}", e);
            }
        }
    }

    fn record(run: &mut Run, kind: ArtifactKind, path: PathBuf) {
        run.snapshot.status_message = format!("{} saved to {}", kind, path.display());
        run.snapshot.artifacts.insert(kind, path);
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::RemoteStatus;
    use crate::poller::PollerConfig;
    use crate::testing::fixtures::pending_then_done;
    use crate::testing::MockGateway;
    use tempfile::TempDir;

    fn orchestrator(gateway: &MockGateway, root: &TempDir, config: PipelineConfig) -> RunOrchestrator {
        RunOrchestrator::new(
            Arc::new(gateway.clone()),
            config,
            JobPoller::new(PollerConfig {
                interval_ms: 1,
                max_attempts: 5,
            }),
            ArtifactStore::new(root.path()),
        )
    }

    async fn wait_terminal(orchestrator: &RunOrchestrator) -> RunSnapshot {
        let mut rx = orchestrator.subscribe();
        let snapshot = rx
            .wait_for(|s| s.status.is_terminal())
            .await
            .unwrap()
            .clone();
        snapshot
    }

    #[tokio::test]
    async fn test_idle_before_first_run() {
        let gateway = MockGateway::new();
        let root = TempDir::new().unwrap();
        let orchestrator = orchestrator(&gateway, &root, PipelineConfig::default());

        let snapshot = orchestrator.read_progress();
        assert_eq!(snapshot.status, RunStatus::Idle);
        assert_eq!(snapshot.stage, Stage::Idle);
        assert!(!orchestrator.request_cancel());
    }

    #[tokio::test]
    async fn test_category_request_reaches_news_source() {
        let gateway = MockGateway::new();
        gateway.queue_poll_statuses(pending_then_done(0, "loc")).await;
        let root = TempDir::new().unwrap();
        let orchestrator = orchestrator(&gateway, &root, PipelineConfig::default());

        orchestrator
            .start_run(RunRequest {
                category: Some(crate::gateway::Category::Sports),
                ..Default::default()
            })
            .unwrap();
        let snapshot = wait_terminal(&orchestrator).await;

        assert_eq!(snapshot.status, RunStatus::Done);
        assert_eq!(snapshot.topic, "Technology News");
        let calls = gateway.calls().await;
        assert_eq!(calls[0].operation, "fetch_topic");
        assert_eq!(calls[0].args, vec!["sports".to_string()]);
    }

    #[tokio::test]
    async fn test_optional_stages_run_in_order() {
        let gateway = MockGateway::new();
        gateway.queue_poll_statuses(pending_then_done(1, "loc")).await;
        let root = TempDir::new().unwrap();
        let config = PipelineConfig {
            synthesize_audio: true,
            fetch_image: true,
            ..Default::default()
        };
        let orchestrator = orchestrator(&gateway, &root, config);

        orchestrator
            .start_run(RunRequest::with_topic("solar flares"))
            .unwrap();
        let snapshot = wait_terminal(&orchestrator).await;

        assert_eq!(snapshot.status, RunStatus::Done);
        let kinds: Vec<_> = snapshot.artifacts.keys().copied().collect();
        assert_eq!(
            kinds,
            vec![
                ArtifactKind::Script,
                ArtifactKind::Audio,
                ArtifactKind::Image,
                ArtifactKind::Video
            ]
        );
        assert!(snapshot.artifacts[&ArtifactKind::Audio]
            .to_string_lossy()
            .ends_with(".mp3"));
    }

    #[tokio::test]
    async fn test_image_failure_does_not_block_video() {
        let gateway = MockGateway::new();
        gateway.queue_poll_statuses(pending_then_done(0, "loc")).await;
        gateway
            .fail_next(
                "fetch_image",
                crate::gateway::GatewayError::Service {
                    service: crate::gateway::Service::Images,
                    status: 403,
                    body: "rate limited".to_string(),
                },
            )
            .await;
        let root = TempDir::new().unwrap();
        let config = PipelineConfig {
            fetch_image: true,
            ..Default::default()
        };
        let orchestrator = orchestrator(&gateway, &root, config);

        orchestrator.start_run(RunRequest::with_topic("x")).unwrap();
        let snapshot = wait_terminal(&orchestrator).await;

        assert_eq!(snapshot.status, RunStatus::Done);
        let kinds: Vec<_> = snapshot.artifacts.keys().copied().collect();
        assert_eq!(kinds, vec![ArtifactKind::Script, ArtifactKind::Video]);
    }

    #[tokio::test]
    async fn test_audio_failure_is_fatal() {
        let gateway = MockGateway::new();
        gateway
            .fail_next(
                "synthesize_speech",
                crate::gateway::GatewayError::Service {
                    service: crate::gateway::Service::Speech,
                    status: 401,
                    body: "invalid api key".to_string(),
                },
            )
            .await;
        let root = TempDir::new().unwrap();
        let config = PipelineConfig {
            synthesize_audio: true,
            ..Default::default()
        };
        let orchestrator = orchestrator(&gateway, &root, config);

        orchestrator.start_run(RunRequest::with_topic("x")).unwrap();
        let snapshot = wait_terminal(&orchestrator).await;

        assert_eq!(snapshot.status, RunStatus::Error);
        assert_eq!(snapshot.stage, Stage::Error);
        assert_eq!(
            snapshot.status_message,
            "Error: speech error: 401 - invalid api key"
        );
        assert_eq!(gateway.call_count("request_avatar_video").await, 0);
    }

    #[tokio::test]
    async fn test_timeout_is_reported_as_still_processing() {
        let gateway = MockGateway::new();
        gateway
            .queue_poll_statuses(vec![RemoteStatus::Pending; 10])
            .await;
        let root = TempDir::new().unwrap();
        let orchestrator = orchestrator(&gateway, &root, PipelineConfig::default());

        orchestrator.start_run(RunRequest::with_topic("x")).unwrap();
        let snapshot = wait_terminal(&orchestrator).await;

        assert_eq!(snapshot.status, RunStatus::Error);
        assert!(snapshot.status_message.contains("still processing"));
        assert_eq!(gateway.call_count("poll_avatar_video").await, 5);
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("bang".to_string())), "bang");
        assert_eq!(panic_message(Box::new(42)), "unknown panic");
    }
}
