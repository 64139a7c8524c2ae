//! tunesmith-core
//!
//! Lifecycle and polling controller for remote music generation.
//!
//! # Modules
//! - **domain**: task record, request, artifact, progress estimation, errors
//! - **ports**: seams to the outside (GenerationApi, Clock, IdGenerator, TaskObserver)
//! - **wire**: JSON request body and response normalization
//! - **impls**: HTTP client and in-process simulator for `GenerationApi`
//! - **app**: `GenerationController` and its builder/config

pub mod domain;
pub mod ports;
pub mod wire;
pub mod impls;
pub mod app;

pub use app::{ControllerBuilder, ControllerConfig, GenerationController, StartPolicy};
pub use domain::{Artifact, GenerationError, GenerationRequest, GenerationTask, TaskStatus};
