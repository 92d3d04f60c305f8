//! # dockerdev
//!
//! A development platform that deploys an application image as a single
//! Docker container on a shared bridge network, then reports its health and
//! tears it down again. Built on [`resource_framework`].
//!
//! ## Architecture Overview
//!
//! ```text
//! Platform::deploy ──► ResourceManager ──► NetworkResource ──┐
//!                                      └─► ContainerResource ─┴─► dyn ContainerEngine
//!                                                                   ├─ DockerEngine (bollard)
//!                                                                   └─ MockEngine (tests)
//! ```
//!
//! - **[platform]**: [`Platform`] with `deploy`, `status` and `destroy`.
//! - **[resources]**: the two resources and the context they share.
//! - **[engine]**: the [`ContainerEngine`](engine::ContainerEngine) seam and
//!   its implementations.
//! - **[config]**: [`PlatformConfig`], loadable from a file and `DOCKERDEV_*`
//!   environment variables.
//! - **[ports]**, **[labels]**, **[limits]**: pure helpers that turn
//!   configuration into engine requests.
//! - **[model]**: records exchanged with the host, including the persisted
//!   [`Deployment`](model::Deployment).
//!
//! ## Concurrency Model
//!
//! One logical flow per call. Hooks run one after another and every call
//! owns its manager, so there is no locking. Dropping a call's future
//! cancels it at the next engine await; wrap calls in
//! `tokio::time::timeout` for a deadline.
//!
//! ## Testing
//!
//! [`engine::mock::MockEngine`] together with
//! [`resource_framework::mock::RecordingLog`] exercises the full deploy,
//! status and destroy flow without a daemon:
//!
//! ```rust
//! use dockerdev::engine::mock::MockEngine;
//! use dockerdev::model::{Artifact, DeploymentConfig, JobInfo, Source};
//! use dockerdev::{Platform, PlatformConfig};
//! use resource_framework::mock::RecordingLog;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = MockEngine::new();
//!     let platform = Platform::new(PlatformConfig::default(), Arc::new(engine.clone()));
//!     let log = RecordingLog::new();
//!
//!     let source = Source { app: "web".into() };
//!     let job = JobInfo { workspace: "default".into() };
//!     let artifact = Artifact::new("nginx", "latest");
//!     let deployment = platform
//!         .deploy(&source, &job, &artifact, &DeploymentConfig::default(), &log)
//!         .await
//!         .unwrap();
//!
//!     let report = platform.status(&deployment, &log).await.unwrap();
//!     assert!(report.is_ready());
//!     assert!(log.open_steps().is_empty());
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod labels;
pub mod limits;
pub mod model;
pub mod platform;
pub mod ports;
pub mod resources;
pub mod state;

pub use config::PlatformConfig;
pub use error::{EngineError, ParseError, PlatformError};
pub use platform::Platform;
pub use state::DockerState;
