//! Domain model (ids, request, artifact, status, task record, progress, errors).
//!
//! Nothing in here performs I/O. The controller in `app` drives these types;
//! `ports` describes the outside world they are fed from.

pub mod artifact;
pub mod errors;
pub mod ids;
pub mod progress;
pub mod request;
pub mod status;
pub mod task;

pub use artifact::Artifact;
pub use errors::{ApiError, ErrorKind, GenerationError};
pub use ids::{RemoteTaskId, SubmissionId};
pub use progress::ProgressEstimator;
pub use request::GenerationRequest;
pub use status::TaskStatus;
pub use task::GenerationTask;
