//! Types for the run orchestrator.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::gateway::{Category, GatewayError, ImageSource};
use crate::poller::RenderError;
use crate::storage::{ArtifactKind, StorageError};

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A run is already in progress; nothing was changed.
    #[error("a run is already in progress")]
    AlreadyRunning,

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("pipeline worker panicked: {0}")]
    Panicked(String),
}

/// Pipeline stage a run is in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Idle,
    FetchingTopic,
    Scripting,
    SynthesizingAudio,
    FetchingImage,
    RenderingVideo,
    Done,
    Error,
    Cancelled,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::FetchingTopic => "fetching_topic",
            Stage::Scripting => "scripting",
            Stage::SynthesizingAudio => "synthesizing_audio",
            Stage::FetchingImage => "fetching_image",
            Stage::RenderingVideo => "rendering_video",
            Stage::Done => "done",
            Stage::Error => "error",
            Stage::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Error | Stage::Cancelled)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall status of the current (or last) run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// No run has been started yet.
    #[default]
    Idle,
    Running,
    Done,
    Error,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::Running => "running",
            RunStatus::Done => "done",
            RunStatus::Error => "error",
            RunStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Done | RunStatus::Error | RunStatus::Cancelled)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable view of a run, published after every transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run_id: Option<Uuid>,
    /// Empty until the topic is resolved (unless supplied by the caller).
    pub topic: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stage: Stage,
    pub status: RunStatus,
    pub status_message: String,
    /// Stored artifacts in completion order.
    pub artifacts: IndexMap<ArtifactKind, PathBuf>,
}

impl RunSnapshot {
    /// Snapshot before any run was started.
    pub fn idle() -> Self {
        Self {
            run_id: None,
            topic: String::new(),
            started_at: None,
            finished_at: None,
            stage: Stage::Idle,
            status: RunStatus::Idle,
            status_message: String::new(),
            artifacts: IndexMap::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }
}

impl Default for RunSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}

/// Parameters for starting a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Use this topic instead of asking the news source.
    #[serde(default)]
    pub topic: Option<String>,
    /// News category; falls back to the configured default.
    #[serde(default)]
    pub category: Option<Category>,
    /// Image source for this run; falls back to the configured mode.
    #[serde(default)]
    pub image_source: Option<ImageSource>,
}

impl RunRequest {
    pub fn with_topic(topic: impl Into<String>) -> Self {
        Self {
            topic: Some(topic.into()),
            ..Default::default()
        }
    }

    /// The trimmed topic override. Blank counts as none.
    pub fn topic_override(&self) -> Option<&str> {
        self.topic
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_topic_is_no_override() {
        assert_eq!(RunRequest::with_topic("   ").topic_override(), None);
        assert_eq!(RunRequest::default().topic_override(), None);
        assert_eq!(
            RunRequest::with_topic(" quantum computing ").topic_override(),
            Some("quantum computing")
        );
    }

    #[test]
    fn test_snapshot_serializes_artifacts_in_order() {
        let mut snapshot = RunSnapshot::idle();
        snapshot.artifacts.insert(ArtifactKind::Video, "/m/v.mp4".into());
        snapshot.artifacts.insert(ArtifactKind::Script, "/m/s.txt".into());

        let json = serde_json::to_string(&snapshot).unwrap();
        let video = json.find("\"video\"").unwrap();
        let script = json.find("\"script\"").unwrap();
        assert!(video < script);
        assert!(json.contains("\"status\":\"idle\""));
    }

    #[test]
    fn test_run_request_from_json() {
        let request: RunRequest = serde_json::from_str(
            r#"{"topic": "mars", "category": "science", "image_source": {"type": "placeholder"}}"#,
        )
        .unwrap();
        assert_eq!(request.topic_override(), Some("mars"));
        assert_eq!(request.category, Some(Category::Science));
        assert_eq!(request.image_source, Some(ImageSource::Placeholder));
    }
}
