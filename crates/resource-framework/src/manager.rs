//! # Resource Manager
//!
//! This module defines the `ResourceManager`, which drives an ordered set of
//! resources through their lifecycle and owns their state between hooks.

use crate::error::{DestroyFailures, ManagerError};
use crate::log::OperationLog;
use crate::resource::{CreatedStates, Resource, ResourceState};
use crate::snapshot::{Snapshot, SnapshotEntry};
use crate::status::StatusReport;
use tracing::{debug, info, warn};

/// Boxed resource as stored by a manager.
pub type DynResource<C, S> = Box<dyn Resource<Context = C, State = S>>;

struct Registered<C, S>
where
    C: Send + Sync,
    S: ResourceState,
{
    resource: DynResource<C, S>,
    state: S,
}

/// Orchestrates an ordered collection of resources.
///
/// ## ResourceManager
///
/// Resources are kept in registration order, which is also the order of
/// every forward pass. Each resource's state lives next to it in the manager;
/// hooks receive it by reference and `create` hands back a replacement.
///
/// * **Sequential** – hooks run one at a time because later resources read
///   what earlier ones recorded.
/// * **Exclusive** – a manager is built per invocation and owns its states.
///   There is no locking.
///
/// ## Operations
///
/// * **create_all**:
///     1. Walks resources in registration order.
///     2. Passes each `create` the states of the resources before it.
///     3. Stores the returned state; on the first error returns it. Resources
///        created earlier stay provisioned, nothing is rolled back.
///
/// * **destroy_all**:
///     1. Walks resources in reverse registration order.
///     2. Resets each successfully destroyed resource to its empty state.
///     3. Keeps going after a failure and returns every failure at the end.
///
/// * **snapshot / load_state**: serialize every state into a [`Snapshot`],
///   and restore from one. A name in the snapshot that is not registered is
///   an error; registered resources absent from the snapshot keep their
///   empty state.
///
/// * **status_report**: calls every `status` hook in order and aggregates
///   health. The first failing hook aborts the report.
pub struct ResourceManager<C, S>
where
    C: Send + Sync,
    S: ResourceState,
{
    entries: Vec<Registered<C, S>>,
}

impl<C, S> Default for ResourceManager<C, S>
where
    C: Send + Sync,
    S: ResourceState,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C, S> ResourceManager<C, S>
where
    C: Send + Sync,
    S: ResourceState,
{
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends a resource; order of registration is order of creation.
    pub fn register<R>(&mut self, resource: R) -> Result<(), ManagerError>
    where
        R: Resource<Context = C, State = S> + 'static,
    {
        self.register_boxed(Box::new(resource))
    }

    pub fn register_boxed(&mut self, resource: DynResource<C, S>) -> Result<(), ManagerError> {
        let name = resource.name().to_string();
        if self.position(&name).is_some() {
            return Err(ManagerError::DuplicateResource(name));
        }
        let state = resource.empty_state();
        debug!(resource = %name, kind = state.kind(), "Registered");
        self.entries.push(Registered { resource, state });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.resource.name())
    }

    /// Looks up a resource by name.
    ///
    /// Resource sets are fixed when the manager is built, so an unknown name
    /// means the caller and the manager disagree about the topology.
    pub fn resource(&self, name: &str) -> Result<&dyn Resource<Context = C, State = S>, ManagerError> {
        Ok(self.entry(name)?.resource.as_ref())
    }

    /// Current state of the named resource.
    pub fn state(&self, name: &str) -> Result<&S, ManagerError> {
        Ok(&self.entry(name)?.state)
    }

    /// Replaces the state of the named resource.
    ///
    /// Fails with [`ManagerError::StateMismatch`] when `state` has a
    /// different shape than the resource declares.
    pub fn set_state(&mut self, name: &str, state: S) -> Result<(), ManagerError> {
        let idx = self
            .position(name)
            .ok_or_else(|| ManagerError::UnknownResource(name.to_string()))?;
        let entry = &mut self.entries[idx];
        check_kind(entry.resource.as_ref(), &state)?;
        entry.state = state;
        Ok(())
    }

    /// Creates every resource in registration order, stopping at the first failure.
    pub async fn create_all(&mut self, ctx: &C, log: &dyn OperationLog) -> Result<(), ManagerError> {
        for idx in 0..self.entries.len() {
            let (before, rest) = self.entries.split_at_mut(idx);
            let entry = &mut rest[0];
            let name = entry.resource.name().to_string();

            let created = CreatedStates::new(
                before
                    .iter()
                    .map(|e| (e.resource.name(), &e.state))
                    .collect(),
            );

            debug!(resource = %name, prior = created.len(), "Create");
            match entry.resource.create(ctx, &created, log).await {
                Ok(state) => {
                    check_kind(entry.resource.as_ref(), &state)?;
                    entry.state = state;
                    info!(resource = %name, "Created");
                }
                Err(e) => {
                    warn!(resource = %name, error = %e, "Create failed");
                    return Err(ManagerError::Create {
                        name,
                        source: e,
                    });
                }
            }
        }
        Ok(())
    }

    /// Destroys every resource in reverse registration order.
    ///
    /// Failures do not stop the pass; they are collected and returned together.
    pub async fn destroy_all(&mut self, ctx: &C, log: &dyn OperationLog) -> Result<(), ManagerError> {
        let mut failures = DestroyFailures::default();

        for entry in self.entries.iter_mut().rev() {
            let name = entry.resource.name().to_string();
            debug!(resource = %name, "Destroy");
            match entry.resource.destroy(ctx, &entry.state, log).await {
                Ok(()) => {
                    entry.state = entry.resource.empty_state();
                    info!(resource = %name, "Destroyed");
                }
                Err(e) => {
                    warn!(resource = %name, error = %e, "Destroy failed");
                    failures.push(name, e);
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ManagerError::Destroy(failures))
        }
    }

    /// Serializes every registered resource's state, in registration order.
    pub fn snapshot(&self) -> Result<Snapshot, ManagerError> {
        let resources = self
            .entries
            .iter()
            .map(|e| {
                let name = e.resource.name().to_string();
                let state = serde_json::to_value(&e.state).map_err(|source| ManagerError::Encode {
                    name: name.clone(),
                    source,
                })?;
                Ok(SnapshotEntry {
                    name,
                    platform: e.resource.platform().to_string(),
                    category: e.resource.category(),
                    state,
                })
            })
            .collect::<Result<Vec<_>, ManagerError>>()?;

        Ok(Snapshot { resources })
    }

    /// Restores states from a snapshot produced by a manager of the same topology.
    ///
    /// Every entry is resolved and decoded before any state is replaced, so
    /// on error the manager is left exactly as it was.
    pub fn load_state(&mut self, snapshot: &Snapshot) -> Result<(), ManagerError> {
        let mut decoded = Vec::with_capacity(snapshot.resources.len());
        for entry in &snapshot.resources {
            let idx = self
                .position(&entry.name)
                .ok_or_else(|| ManagerError::UnknownResource(entry.name.clone()))?;
            let state: S =
                serde_json::from_value(entry.state.clone()).map_err(|source| ManagerError::Decode {
                    name: entry.name.clone(),
                    source,
                })?;
            check_kind(self.entries[idx].resource.as_ref(), &state)?;
            decoded.push((idx, state));
        }

        for (idx, state) in decoded {
            let entry = &mut self.entries[idx];
            debug!(resource = %entry.resource.name(), "Loaded state");
            entry.state = state;
        }
        Ok(())
    }

    /// Collects every resource's status and aggregates the overall health.
    pub async fn status_report(&self, ctx: &C, log: &dyn OperationLog) -> Result<StatusReport, ManagerError> {
        let mut resources = Vec::new();

        for entry in &self.entries {
            let name = entry.resource.name();
            debug!(resource = %name, "Status");
            let statuses = entry
                .resource
                .status(ctx, &entry.state, log)
                .await
                .map_err(|e| {
                    warn!(resource = %name, error = %e, "Status failed");
                    ManagerError::Status {
                        name: name.to_string(),
                        source: e,
                    }
                })?;
            resources.extend(statuses.into_iter().map(|mut s| {
                if s.platform.is_empty() {
                    s.platform = entry.resource.platform().to_string();
                }
                s
            }));
        }

        let report = StatusReport::from_resources(resources);
        info!(health = %report.health, resources = report.resources.len(), "Status report built");
        Ok(report)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.resource.name() == name)
    }

    fn entry(&self, name: &str) -> Result<&Registered<C, S>, ManagerError> {
        self.entries
            .iter()
            .find(|e| e.resource.name() == name)
            .ok_or_else(|| ManagerError::UnknownResource(name.to_string()))
    }
}

fn check_kind<C: Send + Sync, S: ResourceState>(
    resource: &dyn Resource<Context = C, State = S>,
    state: &S,
) -> Result<(), ManagerError> {
    let expected = resource.empty_state().kind();
    let found = state.kind();
    if expected != found {
        return Err(ManagerError::StateMismatch {
            name: resource.name().to_string(),
            expected,
            found,
        });
    }
    Ok(())
}
