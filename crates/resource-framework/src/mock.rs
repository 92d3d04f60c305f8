//! # Testing Helpers
//!
//! In-memory stand-ins for the two seams of the framework, so lifecycle
//! logic can be tested without an engine or a terminal.
//!
//! | Helper | Stands in for | Use it to assert |
//! |--------|---------------|------------------|
//! | [`RecordingLog`] | a terminal / step group | every step was terminated, what was printed |
//! | [`ScriptedResource`] | a real resource | call order, inputs seen by `create`, failure handling |
//!
//! ## Example
//!
//! ```rust
//! use resource_framework::mock::{CallLog, MockState, RecordingLog, ScriptedResource};
//! use resource_framework::ResourceManager;
//!
//! #[tokio::main]
//! async fn main() {
//!     let calls = CallLog::new();
//!     let mut rm: ResourceManager<(), MockState> = ResourceManager::new();
//!     rm.register(ScriptedResource::new("network", &calls).produces("waypoint")).unwrap();
//!     rm.register(ScriptedResource::new("container", &calls).fail_create("pull failed")).unwrap();
//!
//!     let log = RecordingLog::new();
//!     assert!(rm.create_all(&(), &log).await.is_err());
//!     assert_eq!(calls.calls(), vec!["create:network", "create:container"]);
//!     assert!(log.open_steps().is_empty());
//! }
//! ```

use crate::error::ResourceError;
use crate::health::Health;
use crate::log::{OperationLog, Step, StepOutcome, StepSink, StepStatus};
use crate::resource::{CategoryDisplayHint, CreatedStates, Resource, ResourceState};
use crate::status::ResourceStatus;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// =============================================================================
// RECORDING LOG
// =============================================================================

/// Everything a [`RecordingLog`] saw, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    Started { step: usize, message: String },
    Updated { step: usize, message: String },
    Status { step: usize, status: StepStatus },
    Finished { step: usize, outcome: StepOutcome },
    Summary { status: StepStatus, message: String },
}

/// An [`OperationLog`] that records every event for later assertions.
///
/// Cheap to clone; clones share the same event list.
#[derive(Debug, Clone, Default)]
pub struct RecordingLog {
    events: Arc<Mutex<Vec<LogEvent>>>,
    next_step: Arc<AtomicUsize>,
}

impl RecordingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Steps that were started but never finished.
    pub fn open_steps(&self) -> Vec<String> {
        let events = self.events();
        events
            .iter()
            .filter_map(|e| match e {
                LogEvent::Started { step, message } => {
                    let finished = events
                        .iter()
                        .any(|f| matches!(f, LogEvent::Finished { step: s, .. } if s == step));
                    (!finished).then(|| message.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Outcomes of finished steps, in finishing order.
    pub fn outcomes(&self) -> Vec<StepOutcome> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                LogEvent::Finished { outcome, .. } => Some(outcome),
                _ => None,
            })
            .collect()
    }

    /// Every message passed to `begin_step` or `update`.
    pub fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                LogEvent::Started { message, .. } | LogEvent::Updated { message, .. } => {
                    Some(message)
                }
                _ => None,
            })
            .collect()
    }

    pub fn summaries(&self) -> Vec<(StepStatus, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                LogEvent::Summary { status, message } => Some((status, message)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: LogEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl OperationLog for RecordingLog {
    fn begin_step(&self, message: &str) -> Box<dyn StepSink> {
        let step = self.next_step.fetch_add(1, Ordering::SeqCst);
        self.push(LogEvent::Started {
            step,
            message: message.to_string(),
        });
        Box::new(RecordingStep {
            log: self.clone(),
            step,
        })
    }

    fn summary(&self, status: StepStatus, message: &str) {
        self.push(LogEvent::Summary {
            status,
            message: message.to_string(),
        });
    }
}

struct RecordingStep {
    log: RecordingLog,
    step: usize,
}

impl StepSink for RecordingStep {
    fn update(&mut self, message: &str) {
        self.log.push(LogEvent::Updated {
            step: self.step,
            message: message.to_string(),
        });
    }

    fn set_status(&mut self, status: StepStatus) {
        self.log.push(LogEvent::Status {
            step: self.step,
            status,
        });
    }

    fn finish(&mut self, outcome: StepOutcome) {
        self.log.push(LogEvent::Finished {
            step: self.step,
            outcome,
        });
    }
}

// =============================================================================
// SCRIPTED RESOURCE
// =============================================================================

/// Shared, ordered record of hook invocations (`"create:a"`, `"status:b"`, ...).
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: &str, resource: &str) {
        self.calls.lock().unwrap().push(format!("{op}:{resource}"));
    }
}

/// State type used by [`ScriptedResource`].
///
/// `Counter` exists only so tests have a second shape to get wrong.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MockState {
    Value {
        value: Option<String>,
        /// Values of the resources created before this one, by name.
        observed: BTreeMap<String, Option<String>>,
    },
    Counter {
        count: u32,
    },
}

impl MockState {
    pub fn empty() -> Self {
        MockState::Value {
            value: None,
            observed: BTreeMap::new(),
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            MockState::Value { value, .. } => value.as_deref(),
            MockState::Counter { .. } => None,
        }
    }

    pub fn observed(&self) -> BTreeMap<String, Option<String>> {
        match self {
            MockState::Value { observed, .. } => observed.clone(),
            MockState::Counter { .. } => BTreeMap::new(),
        }
    }
}

impl ResourceState for MockState {
    fn kind(&self) -> &'static str {
        match self {
            MockState::Value { .. } => "value",
            MockState::Counter { .. } => "counter",
        }
    }
}

/// A resource whose hooks follow a script set up with builder methods.
///
/// `create` opens a step, records what the resources before it hold and
/// returns `Value { value: produces, .. }`. Each hook can be told to fail.
#[derive(Debug, Clone)]
pub struct ScriptedResource {
    name: String,
    calls: CallLog,
    produces: Option<String>,
    health: Health,
    create_error: Option<String>,
    destroy_error: Option<String>,
    status_error: Option<String>,
}

impl ScriptedResource {
    pub fn new(name: impl Into<String>, calls: &CallLog) -> Self {
        Self {
            name: name.into(),
            calls: calls.clone(),
            produces: None,
            health: Health::Ready,
            create_error: None,
            destroy_error: None,
            status_error: None,
        }
    }

    pub fn produces(mut self, value: impl Into<String>) -> Self {
        self.produces = Some(value.into());
        self
    }

    pub fn health(mut self, health: Health) -> Self {
        self.health = health;
        self
    }

    pub fn fail_create(mut self, msg: impl Into<String>) -> Self {
        self.create_error = Some(msg.into());
        self
    }

    pub fn fail_destroy(mut self, msg: impl Into<String>) -> Self {
        self.destroy_error = Some(msg.into());
        self
    }

    pub fn fail_status(mut self, msg: impl Into<String>) -> Self {
        self.status_error = Some(msg.into());
        self
    }
}

#[async_trait]
impl Resource for ScriptedResource {
    type Context = ();
    type State = MockState;

    fn name(&self) -> &str {
        &self.name
    }

    fn platform(&self) -> &str {
        "mock"
    }

    fn category(&self) -> CategoryDisplayHint {
        CategoryDisplayHint::Other
    }

    fn empty_state(&self) -> MockState {
        MockState::empty()
    }

    async fn create(
        &self,
        _ctx: &(),
        created: &CreatedStates<'_, MockState>,
        log: &dyn OperationLog,
    ) -> Result<MockState, ResourceError> {
        self.calls.record("create", &self.name);
        let step = Step::begin(log, format!("Creating {}", self.name));

        if let Some(msg) = &self.create_error {
            return Err(ResourceError::precondition(msg.clone()));
        }

        let observed = created
            .names()
            .filter_map(|n| created.get(n).map(|s| (n.to_string(), s.value().map(str::to_string))))
            .collect();
        step.done();

        Ok(MockState::Value {
            value: self.produces.clone(),
            observed,
        })
    }

    async fn destroy(
        &self,
        _ctx: &(),
        _state: &MockState,
        _log: &dyn OperationLog,
    ) -> Result<(), ResourceError> {
        self.calls.record("destroy", &self.name);
        match &self.destroy_error {
            Some(msg) => Err(ResourceError::internal(msg.clone())),
            None => Ok(()),
        }
    }

    async fn status(
        &self,
        _ctx: &(),
        state: &MockState,
        _log: &dyn OperationLog,
    ) -> Result<Vec<ResourceStatus>, ResourceError> {
        self.calls.record("status", &self.name);
        if let Some(msg) = &self.status_error {
            return Err(ResourceError::precondition(msg.clone()));
        }
        Ok(vec![ResourceStatus::new(&self.name, self.category(), self.health)
            .with_id(state.value().unwrap_or_default())])
    }
}
