//! # Status Reports
//!
//! Records produced by the status pass: one [`ResourceStatus`] per remote
//! object, collected into a [`StatusReport`] with an aggregate verdict.

use crate::health::Health;
use crate::resource::CategoryDisplayHint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time status of one remote object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceStatus {
    pub name: String,
    /// Identifier assigned by the remote engine, empty when unknown.
    pub id: String,
    pub platform: String,
    pub category: CategoryDisplayHint,
    pub health: Health,
    pub health_message: String,
    pub created_time: Option<DateTime<Utc>>,
    /// Raw engine state rendered as JSON, for display only.
    pub state_json: String,
}

impl ResourceStatus {
    pub fn new(name: impl Into<String>, category: CategoryDisplayHint, health: Health) -> Self {
        Self {
            name: name.into(),
            category,
            health,
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.health_message = msg.into();
        self
    }
}

/// Ordered per-resource statuses plus the deployment-level verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub resources: Vec<ResourceStatus>,
    pub health: Health,
    pub health_message: String,
    pub generated_time: DateTime<Utc>,
}

impl StatusReport {
    /// Builds a report, computing the aggregate from `resources`.
    pub fn from_resources(resources: Vec<ResourceStatus>) -> Self {
        let (health, health_message) = Health::aggregate(resources.iter().map(|r| r.health));
        Self {
            resources,
            health,
            health_message,
            generated_time: Utc::now(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.health == Health::Ready
    }
}
