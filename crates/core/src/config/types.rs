use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::gateway::{
    AvatarConfig, ImagesConfig, NewsConfig, QuotaConfig, ScriptConfig, SpeechConfig,
};
use crate::orchestrator::PipelineConfig;
use crate::poller::PollerConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub quotas: QuotaConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Where run artifacts are written.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// One folder per topic is created below this directory.
    #[serde(default = "default_output_root")]
    pub root: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: default_output_root(),
        }
    }
}

fn default_output_root() -> PathBuf {
    PathBuf::from("./media")
}

/// Credentials and endpoints for every remote capability.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServicesConfig {
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub script: ScriptConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub avatar: AvatarConfig,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub output: OutputConfig,
    pub pipeline: PipelineConfig,
    pub poller: PollerConfig,
    pub services: SanitizedServicesConfig,
    pub quotas: QuotaConfig,
}

/// Service endpoints with API keys hidden.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedServicesConfig {
    pub news: SanitizedServiceConfig,
    pub script: SanitizedServiceConfig,
    pub speech: SanitizedServiceConfig,
    pub images: SanitizedServiceConfig,
    pub avatar: SanitizedServiceConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedServiceConfig {
    pub base_url: String,
    pub api_key_configured: bool,
}

impl SanitizedServiceConfig {
    fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key_configured: !api_key.is_empty(),
        }
    }
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let services = &config.services;
        Self {
            server: config.server.clone(),
            output: config.output.clone(),
            pipeline: config.pipeline.clone(),
            poller: config.poller.clone(),
            services: SanitizedServicesConfig {
                news: SanitizedServiceConfig::new(services.news.base_url(), &services.news.api_key),
                script: SanitizedServiceConfig::new(
                    services.script.base_url(),
                    &services.script.api_key,
                ),
                speech: SanitizedServiceConfig::new(
                    services.speech.base_url(),
                    &services.speech.api_key,
                ),
                images: SanitizedServiceConfig::new(
                    services.images.base_url(),
                    &services.images.api_key,
                ),
                avatar: SanitizedServiceConfig::new(
                    services.avatar.base_url(),
                    &services.avatar.api_key,
                ),
            },
            quotas: config.quotas.clone(),
        }
    }
}
