//! Trending-topic source (NewsAPI top headlines).

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::types::{Category, TopicBrief};
use super::{build_client, ensure_success, GatewayError, Service};

const DEFAULT_BASE_URL: &str = "https://newsapi.org";

/// News source configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsConfig {
    /// NewsAPI key.
    #[serde(default)]
    pub api_key: String,
    /// Base URL (default: https://newsapi.org).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl NewsConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }
}

/// Top-headlines client.
pub struct NewsClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct HeadlinesResponse {
    status: String,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl Article {
    fn source_text(&self) -> Option<String> {
        let title = self.title.as_deref().map(str::trim).filter(|t| !t.is_empty());
        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());

        match (title, description) {
            (Some(t), Some(d)) => Some(format!("{} - {}", t, d)),
            (Some(t), None) => Some(t.to_string()),
            (None, Some(d)) => Some(d.to_string()),
            (None, None) => None,
        }
    }
}

impl NewsClient {
    pub fn new(config: &NewsConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            client: build_client(Service::News)?,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Fetch the top headline for a category.
    ///
    /// The topic is always the category headline ("Technology News"); the
    /// article supplies the source text. No articles means fallback text.
    pub async fn fetch_topic(&self, category: Category) -> Result<TopicBrief, GatewayError> {
        let url = format!("{}/v2/top-headlines", self.base_url);

        debug!("News top headlines: category={}", category);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("category", category.as_str()),
                ("language", "en"),
                ("pageSize", "1"),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GatewayError::transport(Service::News, e))?;

        let response = ensure_success(Service::News, response).await?;

        let headlines: HeadlinesResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::parse(Service::News, e))?;

        let article_text = if headlines.status == "ok" {
            headlines.articles.first().and_then(Article::source_text)
        } else {
            None
        };

        match article_text {
            Some(source_text) => Ok(TopicBrief {
                topic: format!("{} News", category.title()),
                source_text,
            }),
            None => {
                warn!(
                    "No headlines returned for category {}, using fallback topic",
                    category
                );
                Ok(TopicBrief::fallback(category))
            }
        }
    }
}
