//! What the user asked for.

use serde::{Deserialize, Serialize};

use super::GenerationError;

pub const MAX_PROMPT_CHARS: usize = 3000;
pub const MAX_LYRICS_CHARS: usize = 5000;
pub const MAX_TAGS: usize = 20;

/// A song description plus optional knobs for the remote model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,

    /// Style / genre tags ("synthwave", "female vocals", ...).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<String>,

    /// Model version selector understood by the remote service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,

    #[serde(default)]
    pub instrumental: bool,

    /// Free-form context from an active "skill" (songwriting preset) that is
    /// folded into the prompt and also sent as metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_context: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_mood(mut self, mood: impl Into<String>) -> Self {
        self.mood = Some(mood.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_lyrics(mut self, lyrics: impl Into<String>) -> Self {
        self.lyrics = Some(lyrics.into());
        self
    }

    pub fn with_model_version(mut self, model_version: impl Into<String>) -> Self {
        self.model_version = Some(model_version.into());
        self
    }

    pub fn instrumental(mut self, instrumental: bool) -> Self {
        self.instrumental = instrumental;
        self
    }

    pub fn with_skill_context(mut self, context: impl Into<String>) -> Self {
        self.skill_context = Some(context.into());
        self
    }

    /// Check the request before anything goes over the wire.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.prompt.trim().is_empty() {
            return Err(GenerationError::Validation("prompt must not be empty".into()));
        }
        let prompt_chars = self.prompt.chars().count();
        if prompt_chars > MAX_PROMPT_CHARS {
            return Err(GenerationError::Validation(format!(
                "prompt is {prompt_chars} characters, the limit is {MAX_PROMPT_CHARS}"
            )));
        }
        if let Some(lyrics) = &self.lyrics {
            let lyrics_chars = lyrics.chars().count();
            if lyrics_chars > MAX_LYRICS_CHARS {
                return Err(GenerationError::Validation(format!(
                    "lyrics are {lyrics_chars} characters, the limit is {MAX_LYRICS_CHARS}"
                )));
            }
        }
        if self.tags.len() > MAX_TAGS {
            return Err(GenerationError::Validation(format!(
                "{} tags given, the limit is {MAX_TAGS}",
                self.tags.len()
            )));
        }
        Ok(())
    }

    /// The prompt actually sent to the model, with the skill context appended.
    pub fn effective_prompt(&self) -> String {
        let prompt = self.prompt.trim();
        match self.skill_context.as_deref().map(str::trim) {
            Some(context) if !context.is_empty() => {
                format!("{prompt}\n\nSkill context:\n{context}")
            }
            _ => prompt.to_string(),
        }
    }
}
