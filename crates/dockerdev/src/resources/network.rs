use super::{PlatformContext, PLATFORM_NAME};
use crate::engine::NetworkCreate;
use crate::state::{DockerState, NETWORK_NAME};
use async_trait::async_trait;
use resource_framework::{
    CategoryDisplayHint, CreatedStates, Health, OperationLog, Resource, ResourceError,
    ResourceStatus, Step,
};
use std::collections::BTreeMap;
use tracing::debug;

/// The shared bridge network containers attach to.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkResource;

fn use_label(name: &str) -> String {
    format!("use={name}")
}

#[async_trait]
impl Resource for NetworkResource {
    type Context = PlatformContext;
    type State = DockerState;

    fn name(&self) -> &str {
        "network"
    }

    fn platform(&self) -> &str {
        PLATFORM_NAME
    }

    fn category(&self) -> CategoryDisplayHint {
        CategoryDisplayHint::Router
    }

    fn empty_state(&self) -> DockerState {
        DockerState::empty_network()
    }

    async fn create(
        &self,
        ctx: &PlatformContext,
        _created: &CreatedStates<'_, DockerState>,
        log: &dyn OperationLog,
    ) -> Result<DockerState, ResourceError> {
        let step = Step::begin(log, "Setting up network...");

        let existing = ctx
            .engine
            .list_networks(&use_label(NETWORK_NAME))
            .await
            .map_err(|e| ResourceError::precondition(format!("unable to list Docker networks: {e}")))?;

        if existing.is_empty() {
            let spec = NetworkCreate {
                name: NETWORK_NAME.to_string(),
                driver: "bridge".to_string(),
                attachable: true,
                labels: BTreeMap::from([("use".to_string(), NETWORK_NAME.to_string())]),
            };
            ctx.engine.create_network(&spec).await.map_err(|e| {
                ResourceError::precondition(format!("unable to create Docker network: {e}"))
            })?;
        } else {
            debug!(network = NETWORK_NAME, "Reusing existing network");
        }
        step.done();

        Ok(DockerState::Network {
            name: NETWORK_NAME.to_string(),
        })
    }

    async fn status(
        &self,
        ctx: &PlatformContext,
        state: &DockerState,
        log: &dyn OperationLog,
    ) -> Result<Vec<ResourceStatus>, ResourceError> {
        let DockerState::Network { name } = state else {
            return Err(ResourceError::internal("network resource holds non-network state"));
        };
        let mut step = Step::begin(log, "Checking status of the Docker network resource...");
        debug!(network = %name, "Querying docker for network status");

        let networks = ctx
            .engine
            .list_networks(&use_label(name))
            .await
            .map_err(|e| ResourceError::precondition(format!("unable to list Docker networks: {e}")))?;

        let statuses = if networks.is_empty() {
            vec![ResourceStatus::new(name.as_str(), self.category(), Health::Missing)]
        } else {
            // Only one is expected, but every match is reported.
            networks
                .into_iter()
                .map(|net| {
                    let state_json = serde_json::json!({ "dockerNetwork": &net }).to_string();
                    ResourceStatus {
                        name: net.name.clone(),
                        id: net.id.clone(),
                        category: self.category(),
                        health: Health::Ready,
                        health_message: "exists".to_string(),
                        created_time: net.created,
                        state_json,
                        ..Default::default()
                    }
                })
                .collect()
        };

        step.update("Finished building report for Docker network resource");
        step.done();
        Ok(statuses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlatformConfig;
    use crate::engine::mock::{EngineOp, MockEngine};
    use crate::engine::NetworkSummary;
    use resource_framework::mock::RecordingLog;
    use std::sync::Arc;

    fn context(engine: &MockEngine) -> PlatformContext {
        PlatformContext {
            engine: Arc::new(engine.clone()),
            config: PlatformConfig::default(),
            inputs: None,
        }
    }

    async fn create(engine: &MockEngine, log: &RecordingLog) -> Result<DockerState, ResourceError> {
        let created = CreatedStates::default();
        NetworkResource.create(&context(engine), &created, log).await
    }

    #[tokio::test]
    async fn creates_network_once() {
        let engine = MockEngine::new();
        let log = RecordingLog::new();

        let state = create(&engine, &log).await.unwrap();
        assert_eq!(state, DockerState::Network { name: "waypoint".into() });
        create(&engine, &log).await.unwrap();

        assert_eq!(engine.count("create_network"), 1);
        assert_eq!(engine.networks()[0].driver, "bridge");
        assert!(log.open_steps().is_empty());
    }

    #[tokio::test]
    async fn list_failure_is_a_precondition() {
        let engine = MockEngine::new();
        engine.fail_on(EngineOp::ListNetworks, "connection refused");
        let log = RecordingLog::new();

        let err = create(&engine, &log).await.unwrap_err();
        assert!(matches!(err, ResourceError::FailedPrecondition(ref m) if m.contains("connection refused")));
        assert!(log.open_steps().is_empty());

        engine.clear_failures();
        assert!(create(&engine, &log).await.is_ok());
    }

    #[tokio::test]
    async fn reuses_labelled_network() {
        let engine = MockEngine::new();
        engine.add_network(NetworkSummary {
            id: "net-existing".into(),
            name: "waypoint".into(),
            driver: "bridge".into(),
            labels: BTreeMap::from([("use".to_string(), "waypoint".to_string())]),
            created: None,
        });

        create(&engine, &RecordingLog::new()).await.unwrap();
        assert_eq!(engine.count("create_network"), 0);

        let state = DockerState::Network { name: "waypoint".into() };
        let statuses = NetworkResource
            .status(&context(&engine), &state, &RecordingLog::new())
            .await
            .unwrap();
        assert_eq!(statuses[0].id, "net-existing");
    }

    #[tokio::test]
    async fn status_reports_missing_network() {
        let engine = MockEngine::new();
        let state = DockerState::Network { name: "waypoint".into() };

        let statuses = NetworkResource
            .status(&context(&engine), &state, &RecordingLog::new())
            .await
            .unwrap();

        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].health, Health::Missing);
        assert_eq!(statuses[0].name, "waypoint");
    }

    #[tokio::test]
    async fn status_reports_existing_network() {
        let engine = MockEngine::new();
        let log = RecordingLog::new();
        let state = create(&engine, &log).await.unwrap();

        let statuses = NetworkResource.status(&context(&engine), &state, &log).await.unwrap();

        assert_eq!(statuses[0].health, Health::Ready);
        assert_eq!(statuses[0].health_message, "exists");
        assert!(statuses[0].created_time.is_some());
        assert!(statuses[0].state_json.contains("dockerNetwork"));
    }
}
