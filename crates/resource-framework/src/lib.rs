//! # Resource Framework
//!
//! Building blocks for provisioning ordered sets of remote infrastructure
//! (networks, containers, volumes) and tracking them across process restarts.
//!
//! ## Architecture Overview
//!
//! The framework separates concerns into three layers:
//!
//! 1. **Resource Layer** ([`Resource`]) - what one unit of infrastructure is and
//!    how to create, destroy and inspect it
//! 2. **Orchestration Layer** ([`ResourceManager`]) - ordering, state
//!    ownership, error collection, health aggregation
//! 3. **Persistence Layer** ([`Snapshot`]) - the serialized form of every
//!    resource's state, stored by the host between invocations
//!
//! A platform writes its resources once against the [`Resource`] trait. The
//! manager handles the walk order, threads earlier states into later
//! creates, and turns a restored snapshot back into live state.
//!
//! ## Core Abstractions
//!
//! ### [`Resource`] - The Unit of Infrastructure
//!
//! ```rust
//! use async_trait::async_trait;
//! use resource_framework::{
//!     CreatedStates, OperationLog, Resource, ResourceError, ResourceManager, ResourceState,
//! };
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! #[serde(tag = "type", rename_all = "snake_case")]
//! enum State {
//!     Volume { path: Option<String> },
//! }
//!
//! impl ResourceState for State {
//!     fn kind(&self) -> &'static str {
//!         "volume"
//!     }
//! }
//!
//! struct Volume;
//!
//! #[async_trait]
//! impl Resource for Volume {
//!     type Context = String;
//!     type State = State;
//!
//!     fn name(&self) -> &str {
//!         "volume"
//!     }
//!
//!     fn empty_state(&self) -> State {
//!         State::Volume { path: None }
//!     }
//!
//!     async fn create(
//!         &self,
//!         root: &String,
//!         _created: &CreatedStates<'_, State>,
//!         _log: &dyn OperationLog,
//!     ) -> Result<State, ResourceError> {
//!         Ok(State::Volume { path: Some(format!("{root}/data")) })
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut rm = ResourceManager::new();
//!     rm.register(Volume).unwrap();
//!
//!     let log = resource_framework::mock::RecordingLog::new();
//!     rm.create_all(&"/srv".to_string(), &log).await.unwrap();
//!     assert_eq!(rm.state("volume").unwrap(), &State::Volume { path: Some("/srv/data".into()) });
//!
//!     // Persist, then restore into a fresh manager of the same shape.
//!     let snapshot = rm.snapshot().unwrap();
//!     let mut restored = ResourceManager::new();
//!     restored.register(Volume).unwrap();
//!     restored.load_state(&snapshot).unwrap();
//!     assert_eq!(restored.state("volume").unwrap(), rm.state("volume").unwrap());
//! }
//! ```
//!
//! ## Context Injection
//!
//! Dependencies (engine client, configuration, deploy inputs) are not stored
//! in resources. They are bundled in `Resource::Context` and passed to every
//! hook, so the same resource value serves deploy, status and destroy.
//!
//! ## Concurrency Model
//!
//! - Hooks run **sequentially**; later resources read earlier states
//! - A manager is built per invocation and owns its states, no locks
//! - Cancellation is dropping the future; open [`log::Step`]s abort on drop
//!
//! ## Testing
//!
//! The [`mock`] module provides a [`mock::RecordingLog`] to assert every step
//! terminated and a [`mock::ScriptedResource`] to drive the manager without
//! an engine.

pub mod error;
pub mod health;
pub mod log;
pub mod manager;
pub mod mock;
pub mod resource;
pub mod snapshot;
pub mod status;
pub mod tracing;

// Re-export core types for convenience
pub use error::{DestroyFailures, ErrorCode, ManagerError, ResourceError};
pub use health::Health;
pub use log::{OperationLog, Step, StepOutcome, StepStatus, TracingLog};
pub use manager::{DynResource, ResourceManager};
pub use resource::{CategoryDisplayHint, CreatedStates, Resource, ResourceState};
pub use snapshot::{Snapshot, SnapshotEntry};
pub use status::{ResourceStatus, StatusReport};
