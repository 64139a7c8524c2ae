//! Identifiers.
//!
//! Two kinds of ids travel through a generation:
//! - [`SubmissionId`]: minted locally (ULID) for every accepted `start`, so log
//!   lines for one submission can be correlated even before the remote API
//!   has answered.
//! - [`RemoteTaskId`]: the opaque identifier handed back by the remote
//!   generation API. We never interpret it.

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Local identifier of one submission.
///
/// ULIDs sort by creation time, so submissions made by one controller order
/// naturally in logs.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(Ulid);

impl SubmissionId {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for SubmissionId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Identifier assigned by the remote generation API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteTaskId(String);

impl RemoteTaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RemoteTaskId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RemoteTaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for RemoteTaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_id_display_has_prefix() {
        let ulid = Ulid::new();
        let id = SubmissionId::from_ulid(ulid);

        assert_eq!(id.as_ulid(), ulid);
        assert_eq!(id.to_string(), format!("sub-{ulid}"));
    }

    #[test]
    fn submission_ids_sort_by_creation_time() {
        let first = SubmissionId::from(Ulid::from_parts(1_000, 7));
        let second = SubmissionId::from(Ulid::from_parts(2_000, 3));

        assert!(first < second);
    }

    #[test]
    fn remote_task_id_serializes_as_plain_string() {
        let id = RemoteTaskId::from("T1");

        assert_eq!(serde_json::to_string(&id).unwrap(), "\"T1\"");
        assert_eq!(id.as_str(), "T1");
        assert_eq!(id.to_string(), "T1");
    }
}
