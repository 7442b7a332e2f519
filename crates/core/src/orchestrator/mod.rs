//! Run orchestrator.
//!
//! Sequences the pipeline stages for a single run at a time:
//! - **Topic**: caller override, or the trending source for a category
//! - **Script**: rephrased and stored as `<base>.txt`
//! - **Audio / Image**: optional, stored as `<base>.mp3` / `<base>.jpg`
//! - **Video**: rendered through the job poller, stored as `<base>.mp4`

mod config;
mod runner;
mod types;

pub use config::{ImageSourceMode, PipelineConfig};
pub use runner::RunOrchestrator;
pub use types::{OrchestratorError, RunRequest, RunSnapshot, RunStatus, Stage};
