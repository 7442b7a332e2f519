//! Request and result types shared by every gateway implementation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// News category used when the topic is derived from the trending source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Business,
    Entertainment,
    General,
    Health,
    Science,
    Sports,
    #[default]
    Technology,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Business,
        Category::Entertainment,
        Category::General,
        Category::Health,
        Category::Science,
        Category::Sports,
        Category::Technology,
    ];

    /// Lowercase name as understood by the news source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Business => "business",
            Category::Entertainment => "entertainment",
            Category::General => "general",
            Category::Health => "health",
            Category::Science => "science",
            Category::Sports => "sports",
            Category::Technology => "technology",
        }
    }

    /// Capitalized name used in generated topic titles.
    pub fn title(&self) -> &'static str {
        match self {
            Category::Business => "Business",
            Category::Entertainment => "Entertainment",
            Category::General => "General",
            Category::Health => "Health",
            Category::Science => "Science",
            Category::Sports => "Sports",
            Category::Technology => "Technology",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved topic plus the text the script is written from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicBrief {
    pub topic: String,
    pub source_text: String,
}

impl TopicBrief {
    /// Brief for a topic supplied by the caller instead of the news source.
    pub fn manual(topic: impl Into<String>) -> Self {
        let topic = topic.into();
        let source_text = format!("Manual topic: {}", topic);
        Self { topic, source_text }
    }

    /// Placeholder used when the news source has nothing for a category.
    pub fn fallback(category: Category) -> Self {
        Self {
            topic: format!("{} News", category.title()),
            source_text: format!(
                "No recent news found for {}. Reporting trending topic instead.",
                category
            ),
        }
    }
}

/// Where the still image for a run comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageSource {
    /// Copy a local file verbatim.
    Upload { path: PathBuf },
    /// Random stock photo matching the topic.
    StockPhoto,
    /// Generated placeholder keyed by the topic text.
    Placeholder,
}

/// Status of a remote render job as reported by a single poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemoteStatus {
    Pending,
    Done { result_location: String },
    Error { reason: String },
    Rejected { reason: String },
}

impl RemoteStatus {
    /// Whether the remote service will not change this job any further.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RemoteStatus::Pending)
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            RemoteStatus::Pending => "pending",
            RemoteStatus::Done { .. } => "done",
            RemoteStatus::Error { .. } => "error",
            RemoteStatus::Rejected { .. } => "rejected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_brief_is_not_empty() {
        for category in Category::ALL {
            let brief = TopicBrief::fallback(category);
            assert!(!brief.topic.is_empty());
            assert!(!brief.source_text.is_empty());
        }
        let brief = TopicBrief::fallback(Category::Science);
        assert_eq!(brief.topic, "Science News");
        assert!(brief.source_text.contains("science"));
    }

    #[test]
    fn test_manual_brief() {
        let brief = TopicBrief::manual("quantum computing");
        assert_eq!(brief.topic, "quantum computing");
        assert_eq!(brief.source_text, "Manual topic: quantum computing");
    }

    #[test]
    fn test_image_source_serialization() {
        let json = serde_json::to_value(ImageSource::Upload {
            path: "/tmp/a.jpg".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "upload");
        assert_eq!(json["path"], "/tmp/a.jpg");

        let parsed: ImageSource = serde_json::from_str(r#"{"type":"placeholder"}"#).unwrap();
        assert_eq!(parsed, ImageSource::Placeholder);
    }

    #[test]
    fn test_remote_status_terminal() {
        assert!(!RemoteStatus::Pending.is_terminal());
        assert!(RemoteStatus::Rejected {
            reason: "nope".into()
        }
        .is_terminal());
        assert_eq!(
            RemoteStatus::Done {
                result_location: "https://x/y.mp4".into()
            }
            .label(),
            "done"
        );
    }
}
