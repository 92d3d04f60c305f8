use resource_framework::Snapshot;
use serde::{Deserialize, Serialize};

/// A deployed application, as persisted by the host between invocations.
///
/// Deployments created before resource snapshots existed carry only
/// `container`; `resource_state` is `None` for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    /// Application name.
    pub name: String,
    /// Id of the container running the application.
    pub container: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_state: Option<Snapshot>,
}

impl Deployment {
    /// A fresh deployment with a newly generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            name: name.into(),
            ..Default::default()
        }
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

    #[test]
    fn ids_are_unique_and_compact() {
        let a = Deployment::new("web");
        let b = Deployment::new("web");
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.len(), 32);
        assert!(!a.id.contains('-'));
    }

    #[test]
    fn legacy_record_has_no_snapshot() {
        let d = Deployment::from_json(r#"{"id":"1","name":"web","container":"abc"}"#).unwrap();
        assert!(d.resource_state.is_none());
        assert_eq!(d.container, "abc");
    }
}
