//! # Platform Resources
//!
//! The two resources a dockerdev deployment is made of, in creation order:
//!
//! 1. [`NetworkResource`] (`"network"`) - the shared `waypoint` bridge network.
//!    Create-only: networks are left behind for reuse by later deployments.
//! 2. [`ContainerResource`] (`"container"`) - the application container,
//!    attached to the network recorded by the first resource.
//!
//! Both share [`PlatformContext`] as their hook context and
//! [`DockerState`](crate::state::DockerState) as their state type.

pub mod container;
pub mod network;

pub use container::{container_health, ContainerResource};
pub use network::NetworkResource;

use crate::config::PlatformConfig;
use crate::engine::ContainerEngine;
use crate::model::{Artifact, DeploymentConfig, JobInfo, Source};
use std::sync::Arc;

pub const PLATFORM_NAME: &str = "dockerdev";

/// Inputs only a deploy has. Status and destroy run without them.
#[derive(Debug, Clone, Default)]
pub struct DeployInputs {
    pub deployment_id: String,
    pub source: Source,
    pub job: JobInfo,
    pub artifact: Artifact,
    pub deploy_config: DeploymentConfig,
}

/// Everything the resource hooks need from outside the manager.
#[derive(Clone)]
pub struct PlatformContext {
    pub engine: Arc<dyn ContainerEngine>,
    pub config: PlatformConfig,
    pub inputs: Option<DeployInputs>,
}
