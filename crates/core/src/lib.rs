pub mod config;
pub mod gateway;
pub mod metrics;
pub mod orchestrator;
pub mod poller;
pub mod storage;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use gateway::{
    Category, Gateway, GatewayError, HttpGateway, ImageSource, QuotaGateway, RemoteStatus,
    Service, ServiceUsage, TopicBrief, UsageTracker,
};
pub use orchestrator::{
    ImageSourceMode, OrchestratorError, PipelineConfig, RunOrchestrator, RunRequest,
    RunSnapshot, RunStatus, Stage,
};
pub use poller::{JobPoller, PollState, PollerConfig, RenderError, RenderJob};
pub use storage::{ArtifactKind, ArtifactStore, RunLayout, StorageError};
