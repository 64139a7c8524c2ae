//! JSON shapes exchanged with the remote generation API.
//!
//! Real deployments disagree on field names (`taskId` vs `task_id` vs `id`,
//! `audioUrl` vs `audio_url`, ...). Everything is funnelled through the
//! normalizer here so the rest of the crate only sees [`RemoteStatus`] and
//! [`RemoteTaskId`].
//!
//! [`RemoteStatus`]: crate::ports::RemoteStatus
//! [`RemoteTaskId`]: crate::domain::RemoteTaskId

mod body;
mod normalize;

pub use body::CreateBody;
pub use normalize::{parse_create_ack, parse_status};
