//! Errors and their classification.

use std::time::Duration;

use thiserror::Error;

use super::TaskStatus;

/// Message used when the remote API reports a failure without explaining it.
pub const GENERIC_REMOTE_FAILURE: &str = "Music generation failed. Please try again.";

/// Operational classification of an error.
///
/// - Transient: worth retrying (network blip, 5xx).
/// - Permanent: retrying will not help (bad input, remote said no).
/// - Infrastructure: the local runtime itself is unusable (disposed controller).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

/// Failure talking to the remote generation API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response (DNS, connect, timeout...).
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx response.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// A response arrived but did not match any accepted shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The request body could not be encoded.
    #[error("failed to encode request: {0}")]
    Encode(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Transport(_) => ErrorKind::Transient,
            ApiError::Http { status, .. } if *status >= 500 || matches!(*status, 408 | 429) => {
                ErrorKind::Transient
            }
            ApiError::Http { .. } | ApiError::Malformed(_) | ApiError::Encode(_) => {
                ErrorKind::Permanent
            }
        }
    }
}

/// Everything that can go wrong with a generation.
///
/// The `Display` output of a variant is what ends up in
/// [`GenerationTask::error`](super::GenerationTask::error) and is shown to the
/// user verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    /// Rejected locally, never reached the network.
    #[error("invalid request: {0}")]
    Validation(String),

    /// A submission is already in flight and the start policy is `Reject`.
    #[error("a generation is already {status}")]
    Busy { status: TaskStatus },

    /// The remote API rejected or never acknowledged the create request.
    #[error("generation request failed: {0}")]
    Create(ApiError),

    /// Status queries kept failing until the retry budget ran out.
    #[error("status polling failed {attempts} times in a row: {source}")]
    PollTransient { attempts: u32, source: ApiError },

    /// A status query was rejected in a way retrying cannot fix (4xx such as
    /// 401 or 404).
    #[error("status query failed: {0}")]
    Poll(ApiError),

    /// The remote service reported that the generation failed.
    #[error("{0}")]
    RemoteTask(String),

    /// A status response could not be understood (e.g. `complete` without a result).
    #[error("malformed response from generation service: {0}")]
    MalformedResponse(String),

    /// The task did not finish within the configured maximum duration.
    #[error("generation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The submission was reset or replaced before the remote acknowledged it.
    #[error("submission was cancelled")]
    Cancelled,

    /// The controller has been disposed.
    #[error("controller has been disposed")]
    Disposed,
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::Create(source) | GenerationError::Poll(source) => source.kind(),
            GenerationError::PollTransient { .. } | GenerationError::Timeout(_) => {
                ErrorKind::Transient
            }
            GenerationError::Validation(_)
            | GenerationError::Busy { .. }
            | GenerationError::RemoteTask(_)
            | GenerationError::MalformedResponse(_)
            | GenerationError::Cancelled => ErrorKind::Permanent,
            GenerationError::Disposed => ErrorKind::Infrastructure,
        }
    }

    /// Build a `RemoteTask` error, substituting a generic message when the
    /// remote did not supply a usable one.
    pub fn remote(message: Option<String>) -> Self {
        let message = message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| GENERIC_REMOTE_FAILURE.to_string());
        GenerationError::RemoteTask(message)
    }
}
