//! Response normalizer.
//!
//! Accepted shapes (anything else is [`ApiError::Malformed`]):
//!
//! create:
//! - `{ "taskId" | "task_id" | "id": <string|integer> }`
//! - the same wrapped in `{ "data": { ... } }`; task keys win over a bare
//!   `id`, and `data.id` wins over a root `id`
//!
//! status:
//! - `{ "status": "processing" | "pending" | "queued" | "running", "progress"?: <number> }`
//! - `{ "status": "complete" | "completed" | "success", "result" | "data": <artifact> }`
//!   where `<artifact>` is an object or a non-empty array of objects (first one wins)
//! - `{ "status": "error" | "failed", "errorMessage" | "error_message" | "error" | "message"?: <string> }`
//! - any of the above wrapped in `{ "data": { ... } }`; when both levels carry
//!   a `status`, the inner one wins

use serde_json::{Map, Value};

use crate::domain::{ApiError, Artifact, RemoteTaskId};
use crate::ports::RemoteStatus;

const TASK_ID_KEYS: [&str; 2] = ["taskId", "task_id"];
const AUDIO_URL_KEYS: [&str; 3] = ["audioUrl", "audio_url", "url"];
const IMAGE_URL_KEYS: [&str; 2] = ["imageUrl", "image_url"];
const ERROR_MESSAGE_KEYS: [&str; 4] = ["errorMessage", "error_message", "error", "message"];

/// Lookup order: explicit task keys (root, then `data`), then a bare `id`
/// (`data`, then root). A root `id` next to a `data` object is usually the
/// envelope's request id, not the task's.
pub fn parse_create_ack(body: &Value) -> Result<RemoteTaskId, ApiError> {
    let root = as_object(body, "create response")?;
    let data = root.get("data").and_then(Value::as_object);
    let found = id_under(root, &TASK_ID_KEYS)
        .or_else(|| data.and_then(|d| id_under(d, &TASK_ID_KEYS)))
        .or_else(|| data.and_then(|d| id_under(d, &["id"])))
        .or_else(|| id_under(root, &["id"]));
    found.ok_or_else(|| {
        ApiError::Malformed("create response has no taskId, task_id or id".to_string())
    })
}

pub fn parse_status(body: &Value) -> Result<RemoteStatus, ApiError> {
    let mut root = as_object(body, "status response")?;
    // A `data` object carrying its own status is the task; the outer status
    // then belongs to the envelope.
    if let Some(data) = root.get("data").and_then(Value::as_object) {
        if data.contains_key("status") || !root.contains_key("status") {
            root = data;
        }
    }

    let status = root
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::Malformed("status response has no status field".to_string()))?;

    match status.trim().to_ascii_lowercase().as_str() {
        "processing" | "pending" | "queued" | "running" => Ok(RemoteStatus::InProgress {
            progress: root.get("progress").and_then(progress_value),
        }),
        "complete" | "completed" | "success" => {
            let payload = root
                .get("result")
                .or_else(|| root.get("data"))
                .ok_or_else(|| {
                    ApiError::Malformed("status is complete but no result was returned".to_string())
                })?;
            parse_artifact(payload).map(RemoteStatus::Complete)
        }
        "error" | "failed" => Ok(RemoteStatus::Failed {
            message: first_string(root, &ERROR_MESSAGE_KEYS),
        }),
        other => Err(ApiError::Malformed(format!("unknown task status {other:?}"))),
    }
}

fn parse_artifact(payload: &Value) -> Result<Artifact, ApiError> {
    let object = match payload {
        Value::Array(items) => items.first().and_then(Value::as_object),
        other => other.as_object(),
    }
    .ok_or_else(|| ApiError::Malformed("result is not an object".to_string()))?;

    let audio_url = first_string(object, &AUDIO_URL_KEYS)
        .ok_or_else(|| ApiError::Malformed("result has no playable media URL".to_string()))?;
    let duration_secs = object
        .get("duration")
        .and_then(Value::as_f64)
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ApiError::Malformed("result has no valid duration".to_string()))?;

    Ok(Artifact {
        audio_url,
        duration_secs,
        title: first_string(object, &["title"]),
        image_url: first_string(object, &IMAGE_URL_KEYS),
    })
}

fn as_object<'a>(body: &'a Value, what: &str) -> Result<&'a Map<String, Value>, ApiError> {
    body.as_object()
        .ok_or_else(|| ApiError::Malformed(format!("{what} is not a JSON object")))
}

fn id_under(object: &Map<String, Value>, keys: &[&str]) -> Option<RemoteTaskId> {
    keys.iter().find_map(|key| match object.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(RemoteTaskId::new(s.trim())),
        Value::Number(n) if n.is_u64() || n.is_i64() => Some(RemoteTaskId::new(n.to_string())),
        _ => None,
    })
}

fn first_string(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        object
            .get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

fn progress_value(value: &Value) -> Option<u8> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    Some(raw.round().clamp(0.0, 100.0) as u8)
}
