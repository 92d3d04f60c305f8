//! # Container Engine
//!
//! The narrow slice of the Docker Engine API the platform needs, expressed as
//! the [`ContainerEngine`] trait so resources can be driven against a real
//! daemon ([`DockerEngine`]) or an in-memory one ([`mock::MockEngine`]).
//!
//! All request and response types are owned by this crate; the bollard models
//! never leak past [`docker`].

pub mod docker;
pub mod mock;

pub use docker::DockerEngine;

use crate::error::EngineError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkSummary {
    pub id: String,
    pub name: String,
    pub driver: String,
    pub labels: BTreeMap<String, String>,
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkCreate {
    pub name: String,
    pub driver: String,
    pub attachable: bool,
    pub labels: BTreeMap<String, String>,
}

/// Everything needed to create one container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerCreate {
    pub name: String,
    /// `image:tag`.
    pub image: String,
    /// Empty keeps the image's default command.
    pub command: Vec<String>,
    pub env: Vec<String>,
    pub labels: BTreeMap<String, String>,
    /// Port keys such as `3000/tcp` mapped to a host port; an empty host
    /// port lets the engine pick one.
    pub ports: BTreeMap<String, String>,
    pub binds: Vec<String>,
    pub memory: Option<i64>,
    pub cpu_shares: Option<i64>,
    /// Network attached at creation time.
    pub network: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerRunState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    #[default]
    Unknown,
}

/// Result of the container's built-in health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthCheckStatus {
    Starting,
    Healthy,
    Unhealthy,
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerState {
    pub status: ContainerRunState,
    pub running: bool,
    pub restarting: bool,
    pub oom_killed: bool,
    pub dead: bool,
    pub exit_code: i64,
    /// `None` when the container has no health check configured.
    pub health: Option<HealthCheckStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerDetails {
    pub id: String,
    /// As reported by the engine, usually with a leading `/`.
    pub name: String,
    pub image: String,
    /// RFC 3339 creation timestamp.
    pub created: String,
    pub state: ContainerState,
    pub env: Vec<String>,
    pub labels: BTreeMap<String, String>,
    /// Attached networks and the container's address on each.
    pub networks: BTreeMap<String, String>,
}

/// One line of image pull output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PullProgress {
    pub status: String,
    pub progress: Option<String>,
}

impl std::fmt::Display for PullProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.progress {
            Some(progress) => write!(f, "{} {}", self.status, progress),
            None => f.write_str(&self.status),
        }
    }
}

const DEFAULT_REGISTRY: &str = "docker.io";

/// Expands a short image reference to its fully qualified form, e.g.
/// `nginx:1.25` to `docker.io/library/nginx:1.25`. Tags and digests are
/// kept. Returns `None` when the name is not a valid reference.
pub fn normalize_reference(reference: &str) -> Option<String> {
    let (rest, digest) = match reference.split_once('@') {
        Some((rest, digest)) => (rest, Some(digest)),
        None => (reference, None),
    };
    let (name, tag) = match rest.rsplit_once(':') {
        Some((name, tag)) if !tag.contains('/') => (name, Some(tag)),
        _ => (rest, None),
    };

    let valid = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || "._-/:".contains(c);
    if name.is_empty() || !name.chars().all(valid) || tag.is_some_and(str::is_empty) {
        return None;
    }

    let qualified = match name.split_once('/') {
        None => format!("{DEFAULT_REGISTRY}/library/{name}"),
        Some((first, _)) if first.contains('.') || first.contains(':') || first == "localhost" => {
            name.to_string()
        }
        Some(_) => format!("{DEFAULT_REGISTRY}/{name}"),
    };

    let mut out = qualified;
    if let Some(tag) = tag {
        out.push(':');
        out.push_str(tag);
    }
    if let Some(digest) = digest {
        out.push('@');
        out.push_str(digest);
    }
    Some(out)
}

#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Networks carrying the given label (`key=value`).
    async fn list_networks(&self, label: &str) -> Result<Vec<NetworkSummary>, EngineError>;

    /// Creates a network and returns its id.
    async fn create_network(&self, spec: &NetworkCreate) -> Result<String, EngineError>;

    async fn connect_network(&self, network: &str, container_id: &str) -> Result<(), EngineError>;

    /// Ids of local images matching `reference`.
    async fn list_images(&self, reference: &str) -> Result<Vec<String>, EngineError>;

    /// Pulls `reference`, yielding progress as the engine reports it.
    fn pull_image<'a>(&'a self, reference: &str) -> BoxStream<'a, Result<PullProgress, EngineError>>;

    /// Creates a container and returns its id. Does not start it.
    async fn create_container(&self, spec: &ContainerCreate) -> Result<String, EngineError>;

    async fn start_container(&self, id: &str) -> Result<(), EngineError>;

    /// Fails with [`EngineError::NotFound`] when no such container exists.
    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, EngineError>;

    async fn remove_container(&self, id: &str, force: bool) -> Result<(), EngineError>;
}
