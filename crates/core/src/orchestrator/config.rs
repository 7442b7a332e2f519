//! Pipeline configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::gateway::{Category, ImageSource};

/// How the optional image stage obtains its picture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSourceMode {
    #[default]
    StockPhoto,
    Placeholder,
    /// Copy `upload_path` verbatim.
    Upload,
}

/// Configuration for pipeline runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Category used when a run has neither a topic nor a category.
    #[serde(default)]
    pub category: Category,

    /// Speech synthesizer voice.
    #[serde(default = "default_voice_id")]
    pub voice_id: String,

    #[serde(default)]
    pub image_source: ImageSourceMode,

    /// Local image used when `image_source = "upload"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_path: Option<PathBuf>,

    /// Run the speech stage and store `<base>.mp3`. A failure ends the run.
    #[serde(default)]
    pub synthesize_audio: bool,

    /// Run the image stage and store `<base>.jpg`. A failure is skipped.
    #[serde(default)]
    pub fetch_image: bool,
}

fn default_voice_id() -> String {
    "21m00Tcm4TlvDq8ikWAM".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            category: Category::default(),
            voice_id: default_voice_id(),
            image_source: ImageSourceMode::default(),
            upload_path: None,
            synthesize_audio: false,
            fetch_image: false,
        }
    }
}

impl PipelineConfig {
    /// The configured image source as a gateway request.
    pub fn image_source(&self) -> ImageSource {
        match self.image_source {
            ImageSourceMode::StockPhoto => ImageSource::StockPhoto,
            ImageSourceMode::Placeholder => ImageSource::Placeholder,
            ImageSourceMode::Upload => ImageSource::Upload {
                path: self.upload_path.clone().unwrap_or_default(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.category, Category::Technology);
        assert_eq!(config.image_source(), ImageSource::StockPhoto);
        assert!(!config.synthesize_audio);
        assert!(!config.fetch_image);
    }

    #[test]
    fn test_deserialize_upload_mode() {
        let toml = r#"
            category = "science"
            image_source = "upload"
            upload_path = "/srv/anchor.jpg"
            fetch_image = true
        "#;
        let config: PipelineConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.category, Category::Science);
        assert_eq!(
            config.image_source(),
            ImageSource::Upload {
                path: PathBuf::from("/srv/anchor.jpg")
            }
        );
        assert!(config.fetch_image);
    }
}
