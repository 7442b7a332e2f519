//! Deterministic artifact naming.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s").unwrap());

/// Kind of durable stage output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Script,
    Audio,
    Image,
    Video,
}

impl ArtifactKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Script => "txt",
            ArtifactKind::Audio => "mp3",
            ArtifactKind::Image => "jpg",
            ArtifactKind::Video => "mp4",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Script => "script",
            ArtifactKind::Audio => "audio",
            ArtifactKind::Image => "image",
            ArtifactKind::Video => "video",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Folder name for a topic: punctuation dropped, spaces to underscores.
pub fn folder_name(topic: &str) -> String {
    let cleaned = NON_WORD.replace_all(topic, "");
    let name = WHITESPACE.replace_all(cleaned.trim(), "_").into_owned();
    if name.is_empty() {
        "untitled".to_string()
    } else {
        name
    }
}

/// Base file name: `<slug(topic)>_<unix_epoch_seconds>`.
pub fn base_name(topic: &str, started_at: DateTime<Utc>) -> String {
    let lowered = topic.to_lowercase();
    let slug = WHITESPACE.replace_all(&lowered, "_");
    let slug = NON_WORD.replace_all(&slug, "");
    format!("{}_{}", slug, started_at.timestamp())
}

/// Where one run writes its artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    pub folder: PathBuf,
    pub base_name: String,
}

impl RunLayout {
    pub fn new(output_root: &Path, topic: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            folder: output_root.join(folder_name(topic)),
            base_name: base_name(topic, started_at),
        }
    }

    pub fn artifact_path(&self, kind: ArtifactKind) -> PathBuf {
        self.folder
            .join(format!("{}.{}", self.base_name, kind.extension()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_base_name() {
        assert_eq!(
            base_name("quantum computing", at(1_700_000_000)),
            "quantum_computing_1700000000"
        );
        assert_eq!(
            base_name("Technology News", at(42)),
            "technology_news_42"
        );
    }

    #[test]
    fn test_base_name_strips_path_separators() {
        assert_eq!(base_name("AI/ML: Q&A", at(1)), "aiml_qa_1");
    }

    #[test]
    fn test_non_ascii_topics_keep_their_letters() {
        assert_eq!(
            base_name("Économie mondiale", at(100)),
            "économie_mondiale_100"
        );
        assert_eq!(base_name("中国经济", at(100)), "中国经济_100");
        assert_eq!(folder_name("中国经济!"), "中国经济");
        assert_eq!(folder_name("Café crème"), "Café_crème");
        assert_ne!(folder_name("中国经济"), folder_name("日本経済"));
    }

    #[test]
    fn test_folder_name() {
        assert_eq!(folder_name("Technology News"), "Technology_News");
        assert_eq!(folder_name("  What's next?  "), "Whats_next");
        assert_eq!(folder_name("self-driving cars"), "self-driving_cars");
        assert_eq!(folder_name("!!!"), "untitled");
    }

    #[test]
    fn test_artifact_paths() {
        let layout = RunLayout::new(Path::new("/media"), "quantum computing", at(99));
        assert_eq!(layout.folder, PathBuf::from("/media/quantum_computing"));
        assert_eq!(
            layout.artifact_path(ArtifactKind::Script),
            PathBuf::from("/media/quantum_computing/quantum_computing_99.txt")
        );
        assert_eq!(
            layout.artifact_path(ArtifactKind::Video),
            PathBuf::from("/media/quantum_computing/quantum_computing_99.mp4")
        );
    }

    #[test]
    fn test_distinct_start_times_do_not_collide() {
        let a = RunLayout::new(Path::new("/m"), "Topic", at(1));
        let b = RunLayout::new(Path::new("/m"), "Topic", at(2));
        assert_eq!(a.folder, b.folder);
        assert_ne!(
            a.artifact_path(ArtifactKind::Script),
            b.artifact_path(ArtifactKind::Script)
        );
    }
}
