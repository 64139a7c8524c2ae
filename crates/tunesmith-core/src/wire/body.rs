use serde::Serialize;

use crate::domain::GenerationRequest;

/// Body of `POST /api/generate`.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody<'a> {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<&'a str>,
    pub instrumental: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_context: Option<&'a str>,
}

impl<'a> From<&'a GenerationRequest> for CreateBody<'a> {
    fn from(request: &'a GenerationRequest) -> Self {
        let tags = request
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            prompt: request.effective_prompt(),
            tags: (!tags.is_empty()).then_some(tags),
            mood: non_blank(&request.mood),
            title: non_blank(&request.title),
            lyrics: non_blank(&request.lyrics),
            model_version: non_blank(&request.model_version),
            instrumental: request.instrumental,
            skill_context: non_blank(&request.skill_context),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
