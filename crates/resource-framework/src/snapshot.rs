//! # Snapshots
//!
//! A [`Snapshot`] is the durable form of a manager's state: an ordered list of
//! resource names, each with the JSON encoding of that resource's state and
//! the display metadata needed to rebuild reports. It is the only thing that
//! outlives a process; the host persists it inside the deployment record.

use crate::resource::CategoryDisplayHint;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub name: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub category: CategoryDisplayHint,
    /// Tagged encoding of the resource's state.
    pub state: serde_json::Value,
}

/// Ordered mapping from resource name to serialized state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub resources: Vec<SnapshotEntry>,
}

impl Snapshot {
    pub fn get(&self, name: &str) -> Option<&SnapshotEntry> {
        self.resources.iter().find(|e| e.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn preserves_entry_order() {
        let snapshot = Snapshot {
            resources: vec![
                SnapshotEntry {
                    name: "network".into(),
                    platform: "dockerdev".into(),
                    category: CategoryDisplayHint::Router,
                    state: json!({"type": "network", "name": "waypoint"}),
                },
                SnapshotEntry {
                    name: "container".into(),
                    platform: "dockerdev".into(),
                    category: CategoryDisplayHint::Instance,
                    state: json!({"type": "container", "id": "abc", "name": "app-1"}),
                },
            ],
        };

        let restored = Snapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(restored.names().collect::<Vec<_>>(), vec!["network", "container"]);
        assert_eq!(restored.get("container").unwrap().category, CategoryDisplayHint::Instance);
    }

    #[test]
    fn missing_metadata_defaults() {
        let snapshot =
            Snapshot::from_json(r#"{"resources":[{"name":"network","state":{"type":"network"}}]}"#)
                .unwrap();
        let entry = snapshot.get("network").unwrap();
        assert_eq!(entry.category, CategoryDisplayHint::Unknown);
        assert!(entry.platform.is_empty());
    }
}
