use super::{types::Config, ConfigError};
use crate::orchestrator::ImageSourceMode;

/// Validate configuration
///
/// Rejects values that would make every run fail or poll forever:
/// - server port 0
/// - a poll budget of zero attempts
/// - `upload` image mode without an upload path
/// - an empty voice identifier
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.poller.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "poller.max_attempts must be at least 1".to_string(),
        ));
    }

    if config.pipeline.image_source == ImageSourceMode::Upload
        && config.pipeline.upload_path.is_none()
    {
        return Err(ConfigError::ValidationError(
            "pipeline.upload_path is required when image_source = \"upload\"".to_string(),
        ));
    }

    if config.pipeline.voice_id.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "pipeline.voice_id cannot be empty".to_string(),
        ));
    }

    Ok(())
}
