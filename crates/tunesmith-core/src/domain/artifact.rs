use serde::{Deserialize, Serialize};

/// A finished song as reported by the remote API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Playable media reference (usually an mp3 URL).
    pub audio_url: String,

    /// Track length in seconds.
    pub duration_secs: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Cover art, when the service renders one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Artifact {
    pub fn new(audio_url: impl Into<String>, duration_secs: f64) -> Self {
        Self {
            audio_url: audio_url.into(),
            duration_secs,
            title: None,
            image_url: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }
}
