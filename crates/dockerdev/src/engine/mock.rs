//! # In-Memory Engine
//!
//! [`MockEngine`] implements [`ContainerEngine`] over plain maps so the
//! platform can be tested end to end without a Docker daemon.
//!
//! * Every call is recorded as `"op:target"` (see [`MockEngine::calls`]).
//! * Any operation can be told to fail with [`MockEngine::fail_on`].
//! * Tests can seed or mutate containers to simulate crashes, health checks
//!   and out-of-band removal.
//!
//! ```rust
//! use dockerdev::engine::mock::{EngineOp, MockEngine};
//! use dockerdev::engine::ContainerEngine;
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = MockEngine::new();
//!     engine.fail_on(EngineOp::ListNetworks, "daemon unreachable");
//!     assert!(engine.list_networks("use=waypoint").await.is_err());
//!     assert_eq!(engine.calls(), vec!["list_networks:use=waypoint"]);
//! }
//! ```

use super::{
    normalize_reference, ContainerCreate, ContainerDetails, ContainerEngine, ContainerRunState, ContainerState,
    NetworkCreate, NetworkSummary, PullProgress,
};
use crate::error::EngineError;
use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// Operations that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineOp {
    ListNetworks,
    CreateNetwork,
    ConnectNetwork,
    ListImages,
    PullImage,
    CreateContainer,
    StartContainer,
    InspectContainer,
    RemoveContainer,
}

#[derive(Debug, Default)]
struct Inner {
    networks: Vec<NetworkSummary>,
    images: Vec<String>,
    containers: BTreeMap<String, ContainerDetails>,
    created: Vec<ContainerCreate>,
    failures: HashMap<EngineOp, String>,
    calls: Vec<String>,
    next_id: u64,
}

/// In-memory [`ContainerEngine`]. Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    inner: Arc<Mutex<Inner>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call of `op` fail with an API error.
    pub fn fail_on(&self, op: EngineOp, message: impl Into<String>) {
        self.lock().failures.insert(op, message.into());
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Marks `reference` as present in the local image cache.
    pub fn add_image(&self, reference: impl Into<String>) {
        self.lock().images.push(reference.into());
    }

    pub fn add_network(&self, network: NetworkSummary) {
        self.lock().networks.push(network);
    }

    pub fn insert_container(&self, details: ContainerDetails) {
        self.lock().containers.insert(details.id.clone(), details);
    }

    /// Applies `f` to a stored container, e.g. to simulate a crash.
    pub fn update_container(&self, id: &str, f: impl FnOnce(&mut ContainerDetails)) {
        if let Some(details) = self.lock().containers.get_mut(id) {
            f(details);
        }
    }

    /// Deletes a container behind the platform's back.
    pub fn forget_container(&self, id: &str) {
        self.lock().containers.remove(id);
    }

    pub fn container(&self, id: &str) -> Option<ContainerDetails> {
        self.lock().containers.get(id).cloned()
    }

    pub fn containers(&self) -> Vec<ContainerDetails> {
        self.lock().containers.values().cloned().collect()
    }

    pub fn networks(&self) -> Vec<NetworkSummary> {
        self.lock().networks.clone()
    }

    pub fn images(&self) -> Vec<String> {
        self.lock().images.clone()
    }

    /// Every container spec passed to `create_container`, in order.
    pub fn created_specs(&self) -> Vec<ContainerCreate> {
        self.lock().created.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Number of recorded calls of operation `op` (e.g. `"remove_container"`).
    pub fn count(&self, op: &str) -> usize {
        let prefix = format!("{op}:");
        self.lock()
            .calls
            .iter()
            .filter(|c| c.starts_with(&prefix))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    /// Records the call and returns the scripted failure for `op`, if any.
    fn enter(&self, op: EngineOp, name: &str, target: &str) -> Result<(), EngineError> {
        let mut inner = self.lock();
        inner.calls.push(format!("{name}:{target}"));
        match inner.failures.get(&op) {
            Some(message) => Err(EngineError::Api(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ContainerEngine for MockEngine {
    async fn list_networks(&self, label: &str) -> Result<Vec<NetworkSummary>, EngineError> {
        self.enter(EngineOp::ListNetworks, "list_networks", label)?;
        let (key, value) = label.split_once('=').unwrap_or((label, ""));
        Ok(self
            .lock()
            .networks
            .iter()
            .filter(|n| n.labels.get(key).map(String::as_str) == Some(value))
            .cloned()
            .collect())
    }

    async fn create_network(&self, spec: &NetworkCreate) -> Result<String, EngineError> {
        self.enter(EngineOp::CreateNetwork, "create_network", &spec.name)?;
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = format!("net{:04}", inner.next_id);
        inner.networks.push(NetworkSummary {
            id: id.clone(),
            name: spec.name.clone(),
            driver: spec.driver.clone(),
            labels: spec.labels.clone(),
            created: Some(Utc::now()),
        });
        Ok(id)
    }

    async fn connect_network(&self, network: &str, container_id: &str) -> Result<(), EngineError> {
        self.enter(EngineOp::ConnectNetwork, "connect_network", network)?;
        let mut inner = self.lock();
        let details = inner
            .containers
            .get_mut(container_id)
            .ok_or_else(|| EngineError::NotFound(format!("No such container: {container_id}")))?;
        details.networks.insert(network.to_string(), String::new());
        Ok(())
    }

    async fn list_images(&self, reference: &str) -> Result<Vec<String>, EngineError> {
        self.enter(EngineOp::ListImages, "list_images", reference)?;
        let wanted = normalize_reference(reference);
        Ok(self
            .lock()
            .images
            .iter()
            .filter(|i| wanted.is_some() && normalize_reference(i) == wanted)
            .cloned()
            .collect())
    }

    fn pull_image<'a>(&'a self, reference: &str) -> BoxStream<'a, Result<PullProgress, EngineError>> {
        if let Err(e) = self.enter(EngineOp::PullImage, "pull_image", reference) {
            return stream::iter(vec![Err(e)]).boxed();
        }
        self.add_image(reference);
        let tag = reference.rsplit_once(':').map(|(_, t)| t).unwrap_or("latest");
        stream::iter(vec![
            Ok(PullProgress {
                status: format!("Pulling from {reference}"),
                progress: None,
            }),
            Ok(PullProgress {
                status: "Download complete".to_string(),
                progress: Some("[==================================================>]".to_string()),
            }),
            Ok(PullProgress {
                status: format!("Status: Downloaded newer image for {tag}"),
                progress: None,
            }),
        ])
        .boxed()
    }

    async fn create_container(&self, spec: &ContainerCreate) -> Result<String, EngineError> {
        self.enter(EngineOp::CreateContainer, "create_container", &spec.name)?;
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = format!("{:064x}", inner.next_id);

        let mut networks = BTreeMap::new();
        if !spec.network.is_empty() {
            networks.insert(spec.network.clone(), format!("172.18.0.{}", inner.next_id % 250 + 2));
        }

        inner.containers.insert(
            id.clone(),
            ContainerDetails {
                id: id.clone(),
                name: format!("/{}", spec.name),
                image: spec.image.clone(),
                created: Utc::now().to_rfc3339(),
                state: ContainerState {
                    status: ContainerRunState::Created,
                    ..Default::default()
                },
                env: spec.env.clone(),
                labels: spec.labels.clone(),
                networks,
            },
        );
        inner.created.push(spec.clone());
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.enter(EngineOp::StartContainer, "start_container", id)?;
        let mut inner = self.lock();
        let details = inner
            .containers
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(format!("No such container: {id}")))?;
        details.state.status = ContainerRunState::Running;
        details.state.running = true;
        Ok(())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, EngineError> {
        self.enter(EngineOp::InspectContainer, "inspect_container", id)?;
        self.lock()
            .containers
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("No such container: {id}")))
    }

    async fn remove_container(&self, id: &str, _force: bool) -> Result<(), EngineError> {
        self.enter(EngineOp::RemoveContainer, "remove_container", id)?;
        self.lock()
            .containers
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| EngineError::NotFound(format!("No such container: {id}")))
    }
}
