//! # Operation Log
//!
//! Progress reporting for lifecycle hooks. A hook opens a [`Step`], updates it
//! as work proceeds and marks it done. Steps are write-only and
//! fire-and-forget; nothing in the lifecycle logic reads them back, so hooks
//! can be exercised without a terminal attached.
//!
//! A [`Step`] that is dropped without [`Step::done`] is reported as aborted.
//! Error returns via `?` therefore always terminate the step.
//!
//! ```rust
//! use resource_framework::log::{Step, TracingLog};
//!
//! fn setup(log: &TracingLog) -> Result<(), String> {
//!     let mut step = Step::begin(log, "Setting up network...");
//!     step.update("Network exists");
//!     step.done();
//!     Ok(())
//! }
//!
//! setup(&TracingLog).unwrap();
//! ```

use tracing::{debug, error, info, warn};

/// Outcome attached to a step or a summary line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Ok,
    Warn,
    Error,
}

/// How a step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Done,
    Aborted,
}

/// Sink for progress output, handed to every lifecycle hook.
pub trait OperationLog: Send + Sync {
    /// Opens a new step. Prefer [`Step::begin`], which guarantees termination.
    fn begin_step(&self, message: &str) -> Box<dyn StepSink>;

    /// Emits a standalone summary line outside any step.
    fn summary(&self, status: StepStatus, message: &str);
}

/// Backend half of a step, implemented by each log.
pub trait StepSink: Send {
    fn update(&mut self, message: &str);
    fn set_status(&mut self, status: StepStatus);
    fn finish(&mut self, outcome: StepOutcome);
}

/// A progress step that is aborted on drop unless marked done.
pub struct Step {
    sink: Box<dyn StepSink>,
    finished: bool,
}

impl Step {
    pub fn begin(log: &dyn OperationLog, message: impl AsRef<str>) -> Self {
        Self {
            sink: log.begin_step(message.as_ref()),
            finished: false,
        }
    }

    pub fn update(&mut self, message: impl AsRef<str>) {
        self.sink.update(message.as_ref());
    }

    pub fn set_status(&mut self, status: StepStatus) {
        self.sink.set_status(status);
    }

    pub fn done(mut self) {
        self.finish(StepOutcome::Done);
    }

    pub fn abort(mut self) {
        self.finish(StepOutcome::Aborted);
    }

    fn finish(&mut self, outcome: StepOutcome) {
        if !self.finished {
            self.finished = true;
            self.sink.finish(outcome);
        }
    }
}

impl Drop for Step {
    fn drop(&mut self) {
        self.finish(StepOutcome::Aborted);
    }
}

/// An [`OperationLog`] that turns steps into `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl OperationLog for TracingLog {
    fn begin_step(&self, message: &str) -> Box<dyn StepSink> {
        info!(step = %message, "Step started");
        Box::new(TracingStep {
            message: message.to_string(),
            status: StepStatus::Ok,
        })
    }

    fn summary(&self, status: StepStatus, message: &str) {
        match status {
            StepStatus::Ok => info!("{message}"),
            StepStatus::Warn => warn!("{message}"),
            StepStatus::Error => error!("{message}"),
        }
    }
}

struct TracingStep {
    message: String,
    status: StepStatus,
}

impl StepSink for TracingStep {
    fn update(&mut self, message: &str) {
        debug!(step = %self.message, update = %message, "Step progress");
        self.message = message.to_string();
    }

    fn set_status(&mut self, status: StepStatus) {
        self.status = status;
    }

    fn finish(&mut self, outcome: StepOutcome) {
        match (outcome, self.status) {
            (StepOutcome::Done, StepStatus::Ok) => info!(step = %self.message, "Step done"),
            (StepOutcome::Done, _) => warn!(step = %self.message, status = ?self.status, "Step done"),
            (StepOutcome::Aborted, _) => warn!(step = %self.message, "Step aborted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{LogEvent, RecordingLog};

    #[test]
    fn dropped_step_is_aborted() {
        let log = RecordingLog::new();
        {
            let mut step = Step::begin(&log, "Creating new container...");
            step.update("Starting container");
        }
        assert!(log.open_steps().is_empty());
        assert_eq!(log.outcomes(), vec![StepOutcome::Aborted]);
    }

    #[test]
    fn done_step_is_not_aborted_again() {
        let log = RecordingLog::new();
        Step::begin(&log, "Setting up network...").done();
        assert_eq!(log.outcomes(), vec![StepOutcome::Done]);
    }

    #[test]
    fn early_return_terminates_step() {
        fn fails(log: &RecordingLog) -> Result<(), String> {
            let _step = Step::begin(log, "Pulling image");
            Err("registry unreachable".to_string())
        }

        let log = RecordingLog::new();
        assert!(fails(&log).is_err());
        assert!(matches!(
            log.events().last(),
            Some(LogEvent::Finished { outcome: StepOutcome::Aborted, .. })
        ));
    }
}
