//! Image source: local upload, Unsplash stock photo, or placeholder service.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::ImageSource;
use super::{build_client, ensure_success, read_bytes, GatewayError, Service};

const DEFAULT_BASE_URL: &str = "https://api.unsplash.com";
const DEFAULT_PLACEHOLDER_URL: &str = "https://via.placeholder.com";

/// Image source configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Unsplash access key (sent as `client_id`).
    #[serde(default)]
    pub api_key: String,
    /// Stock photo API base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Placeholder image service base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder_base_url: Option<String>,
}

impl ImagesConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn placeholder_base_url(&self) -> &str {
        self.placeholder_base_url
            .as_deref()
            .unwrap_or(DEFAULT_PLACEHOLDER_URL)
    }
}

#[derive(Debug, Deserialize)]
struct RandomPhoto {
    urls: PhotoUrls,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: String,
}

/// Image client covering all three image sources.
pub struct ImageClient {
    client: Client,
    base_url: String,
    placeholder_base_url: String,
    api_key: String,
}

impl ImageClient {
    pub fn new(config: &ImagesConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            client: build_client(Service::Images)?,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            placeholder_base_url: config
                .placeholder_base_url()
                .trim_end_matches('/')
                .to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Placeholder URL for a topic. Same topic, same URL.
    pub fn placeholder_url(&self, topic: &str) -> String {
        format!(
            "{}/800x600.png?text={}",
            self.placeholder_base_url,
            urlencoding::encode(topic)
        )
    }

    pub async fn fetch(&self, topic: &str, source: &ImageSource) -> Result<Vec<u8>, GatewayError> {
        match source {
            ImageSource::Upload { path } => {
                debug!("Using uploaded image {:?}", path);
                tokio::fs::read(path).await.map_err(|e| GatewayError::Io {
                    path: path.clone(),
                    source: e,
                })
            }
            ImageSource::StockPhoto => self.fetch_stock_photo(topic).await,
            ImageSource::Placeholder => {
                let url = self.placeholder_url(topic);
                self.download(&url).await
            }
        }
    }

    async fn fetch_stock_photo(&self, topic: &str) -> Result<Vec<u8>, GatewayError> {
        debug!("Stock photo search: query='{}'", topic);

        let response = self
            .client
            .get(format!("{}/photos/random", self.base_url))
            .query(&[("query", topic), ("client_id", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| GatewayError::transport(Service::Images, e))?;

        let response = ensure_success(Service::Images, response).await?;

        let photo: RandomPhoto = response
            .json()
            .await
            .map_err(|e| GatewayError::parse(Service::Images, e))?;

        self.download(&photo.urls.regular).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, GatewayError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::transport(Service::Images, e))?;

        let response = ensure_success(Service::Images, response).await?;
        read_bytes(Service::Images, response).await
    }
}
