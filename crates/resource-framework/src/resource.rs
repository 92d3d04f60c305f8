//! # Resource Trait
//!
//! The `Resource` trait is the contract every unit of remote infrastructure
//! (a network, a container, ...) implements to be driven by the
//! [`ResourceManager`](crate::ResourceManager).
//!
//! # Provided Methods (Hooks)
//! Only [`Resource::name`] and [`Resource::empty_state`] are required. The
//! lifecycle hooks have default implementations:
//! - [`Resource::create`] returns the empty state unchanged
//! - [`Resource::destroy`] succeeds immediately
//! - [`Resource::status`] reports nothing
//!
//! A resource that must never be torn down (a shared network, say) simply
//! keeps the default `destroy`.
//!
//! # State
//! Every resource in one manager shares a single state type, `Self::State`.
//! It is expected to be a serde-tagged enum with one variant per resource
//! shape; [`ResourceState::kind`] names the variant so the manager can reject
//! a value of the wrong shape without looking inside it.

use crate::error::ResourceError;
use crate::log::OperationLog;
use crate::status::ResourceStatus;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Display grouping for reports. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryDisplayHint {
    #[default]
    Unknown,
    Other,
    Instance,
    InstanceManager,
    Router,
    Policy,
    Config,
    Function,
    Storage,
}

/// Opaque, serializable state owned by a resource.
pub trait ResourceState:
    Serialize + DeserializeOwned + Clone + Debug + PartialEq + Send + Sync + 'static
{
    /// Tag naming the shape of this value (e.g. `"network"`).
    fn kind(&self) -> &'static str;
}

/// States of the resources created earlier in the current pass.
///
/// Handed to [`Resource::create`] so a later resource can read what an
/// earlier one recorded, e.g. a container attaching to the network's name.
#[derive(Debug)]
pub struct CreatedStates<'a, S> {
    entries: Vec<(&'a str, &'a S)>,
}

impl<S> Default for CreatedStates<'_, S> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<'a, S> CreatedStates<'a, S> {
    /// Builds the view from `(name, state)` pairs in creation order.
    pub fn new(entries: Vec<(&'a str, &'a S)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&'a S> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, state)| *state)
    }

    pub fn names(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.entries.iter().map(|(n, _)| *n)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A single named unit of remote infrastructure.
///
/// # Context
/// `Self::Context` bundles everything the hooks need from the outside
/// world: the engine client, configuration, deploy inputs. It is shared by
/// every resource in a manager and passed by reference into each hook.
#[async_trait]
pub trait Resource: Send + Sync {
    type Context: Send + Sync;
    type State: ResourceState;

    /// Unique key of this resource within its manager.
    fn name(&self) -> &str;

    /// Informational platform tag.
    fn platform(&self) -> &str {
        ""
    }

    fn category(&self) -> CategoryDisplayHint {
        CategoryDisplayHint::Unknown
    }

    /// Fresh, zero-valued state of this resource's shape.
    fn empty_state(&self) -> Self::State;

    // --- Lifecycle Hooks (Async) ---

    /// Provisions the resource and returns its new state.
    ///
    /// The manager only stores the returned state on `Ok`; on `Err` the
    /// previous state is left untouched. Work already done against the
    /// engine is not undone.
    async fn create(
        &self,
        _ctx: &Self::Context,
        _created: &CreatedStates<'_, Self::State>,
        _log: &dyn OperationLog,
    ) -> Result<Self::State, ResourceError> {
        Ok(self.empty_state())
    }

    /// Tears the resource down. A remote object that is already gone must be
    /// treated as success.
    async fn destroy(
        &self,
        _ctx: &Self::Context,
        _state: &Self::State,
        _log: &dyn OperationLog,
    ) -> Result<(), ResourceError> {
        Ok(())
    }

    /// Reports the current health of the remote object(s) behind `state`.
    ///
    /// Usually one record; resources that may map to several remote objects
    /// return one per object.
    async fn status(
        &self,
        _ctx: &Self::Context,
        _state: &Self::State,
        _log: &dyn OperationLog,
    ) -> Result<Vec<ResourceStatus>, ResourceError> {
        Ok(Vec::new())
    }
}
