//! Persisted state of the dockerdev resources.

use resource_framework::ResourceState;
use serde::{Deserialize, Serialize};

/// Name of the network every container is attached to.
pub const NETWORK_NAME: &str = "waypoint";

/// State of one dockerdev resource, tagged by shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DockerState {
    Network {
        #[serde(default)]
        name: String,
    },
    Container {
        #[serde(default)]
        id: String,
        #[serde(default)]
        name: String,
    },
}

impl DockerState {
    pub fn empty_network() -> Self {
        DockerState::Network {
            name: String::new(),
        }
    }

    pub fn empty_container() -> Self {
        DockerState::Container {
            id: String::new(),
            name: String::new(),
        }
    }
}

impl ResourceState for DockerState {
    fn kind(&self) -> &'static str {
        match self {
            DockerState::Network { .. } => "network",
            DockerState::Container { .. } => "container",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_by_tag() {
        let state: DockerState =
            serde_json::from_str(r#"{"type":"container","id":"abc","name":"web-1"}"#).unwrap();
        assert_eq!(state.kind(), "container");

        let state: DockerState = serde_json::from_str(r#"{"type":"network"}"#).unwrap();
        assert_eq!(state, DockerState::empty_network());
    }
}
