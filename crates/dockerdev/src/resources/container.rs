use super::{DeployInputs, PlatformContext, PLATFORM_NAME};
use crate::config::PlatformConfig;
use crate::engine::{
    normalize_reference, ContainerCreate, ContainerEngine, ContainerRunState, ContainerState,
    HealthCheckStatus,
};
use crate::labels::{default_labels, merge_labels};
use crate::limits::Limits;
use crate::model::Artifact;
use crate::ports::parse_published_ports;
use crate::state::DockerState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use resource_framework::{
    CategoryDisplayHint, CreatedStates, Health, OperationLog, Resource, ResourceError,
    ResourceStatus, Step, StepStatus,
};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// The application container.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerResource;

/// Maps engine-reported state to a health value and message.
///
/// A configured health check takes precedence; without one the run state
/// is interpreted.
pub fn container_health(state: &ContainerState) -> (Health, &'static str) {
    if let Some(check) = state.health {
        return match check {
            HealthCheckStatus::Healthy => (Health::Ready, "container is running"),
            HealthCheckStatus::Unhealthy => (Health::Down, "container is down"),
            HealthCheckStatus::Starting => (Health::Alive, "container is starting"),
            HealthCheckStatus::Other => {
                (Health::Unknown, "unknown status reported by docker for container")
            }
        };
    }

    if state.running && state.exit_code == 0 {
        (Health::Ready, "container is running")
    } else if state.restarting || state.status == ContainerRunState::Created {
        (Health::Alive, "container is still starting")
    } else if state.dead || state.oom_killed || state.exit_code != 0 {
        (Health::Down, "container is down")
    } else {
        (Health::Unknown, "unknown status for container")
    }
}

/// Pulls the artifact's image unless it is cached or `force` is set.
async fn pull_image(
    engine: &dyn ContainerEngine,
    artifact: &Artifact,
    force: bool,
    log: &dyn OperationLog,
) -> Result<(), ResourceError> {
    let reference = artifact.reference();
    let mut step = Step::begin(log, format!("Preparing image {reference}"));

    if !force {
        step.update(format!("Checking Docker image cache for Image {reference}"));
        let cached = engine.list_images(&reference).await.map_err(|e| {
            ResourceError::precondition(format!("unable to list images in local Docker cache: {e}"))
        })?;
        if !cached.is_empty() {
            step.update(format!("Docker image {reference:?} up to date!"));
            step.done();
            return Ok(());
        }
    }

    step.update(format!("Pulling Docker Image {reference}"));
    let normalized = normalize_reference(&reference).ok_or_else(|| {
        ResourceError::invalid_argument(format!("unable to parse image name: {reference}"))
    })?;
    debug!(image = %normalized, "Pulling image");

    let mut progress = engine.pull_image(&normalized);
    while let Some(line) = progress.next().await {
        let line = line.map_err(|e| {
            ResourceError::precondition(format!("unable to pull image from Docker registry: {e}"))
        })?;
        step.update(line.to_string());
    }

    step.done();
    Ok(())
}

/// Builds the engine request for the application container.
fn container_spec(
    config: &PlatformConfig,
    inputs: &DeployInputs,
    network: &str,
) -> Result<ContainerCreate, ResourceError> {
    let app = &inputs.source.app;
    let service_port = config.effective_service_port();

    let mut ports = BTreeMap::new();
    for field in parse_published_ports(&config.published_ports)? {
        ports.insert(field.key(), field.host_port);
    }
    for port in config.extra_ports.iter().chain([&service_port]) {
        ports.insert(format!("{port}/tcp"), String::new());
    }

    let env = std::iter::once(format!("PORT={service_port}"))
        .chain(config.static_environment.iter().map(|(k, v)| format!("{k}={v}")))
        .chain(inputs.deploy_config.env.iter().map(|(k, v)| format!("{k}={v}")))
        .collect();

    let binds = std::iter::once(format!("{app}-scratch:{}", config.scratch_target()))
        .chain(config.binds.iter().cloned())
        .collect();

    let limits = match &config.resources {
        Some(resources) => Limits::from_config(resources)?,
        None => Limits::default(),
    };

    let labels = merge_labels(
        &config.labels,
        &default_labels(&inputs.deployment_id, app, &inputs.job.workspace),
    );

    let name = if config.use_app_as_container_name {
        app.clone()
    } else {
        format!("{app}-{}", inputs.deployment_id)
    };

    Ok(ContainerCreate {
        name,
        image: inputs.artifact.reference(),
        command: config.command.clone(),
        env,
        labels,
        ports,
        binds,
        memory: limits.memory,
        cpu_shares: limits.cpu_shares,
        network: network.to_string(),
    })
}

fn parse_created(value: &str) -> Result<DateTime<Utc>, ResourceError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            ResourceError::internal(format!("failed to parse docker timestamp {value:?}: {e}"))
        })
}

#[async_trait]
impl Resource for ContainerResource {
    type Context = PlatformContext;
    type State = DockerState;

    fn name(&self) -> &str {
        "container"
    }

    fn platform(&self) -> &str {
        PLATFORM_NAME
    }

    fn category(&self) -> CategoryDisplayHint {
        CategoryDisplayHint::Instance
    }

    fn empty_state(&self) -> DockerState {
        DockerState::empty_container()
    }

    async fn create(
        &self,
        ctx: &PlatformContext,
        created: &CreatedStates<'_, DockerState>,
        log: &dyn OperationLog,
    ) -> Result<DockerState, ResourceError> {
        let inputs = ctx
            .inputs
            .as_ref()
            .ok_or_else(|| ResourceError::internal("container create called without deploy inputs"))?;
        let network = match created.get("network") {
            Some(DockerState::Network { name }) if !name.is_empty() => name.clone(),
            _ => return Err(ResourceError::internal("network state is missing")),
        };
        let engine = ctx.engine.as_ref();

        pull_image(engine, &inputs.artifact, ctx.config.force_pull, log).await?;

        let mut step = Step::begin(log, "Creating new container...");
        let spec = container_spec(&ctx.config, inputs, &network)?;

        let id = engine.create_container(&spec).await.map_err(|e| {
            ResourceError::internal(format!("unable to create Docker container: {e}"))
        })?;
        debug!(container = %spec.name, id = %id, "Container created");

        // Only one network can be attached at creation time.
        if !ctx.config.networks.is_empty() {
            step.update("Connecting additional networks to container...");
            for net in &ctx.config.networks {
                if let Err(e) = engine.connect_network(net, &id).await {
                    warn!(container = %id, network = %net, error = %e, "Network connect failed");
                    step.update("Failed to connect additional network");
                    step.set_status(StepStatus::Error);
                    step.done();
                    return Err(ResourceError::internal(format!(
                        "unable to connect container to additional networks: {e}"
                    )));
                }
            }
        }

        step.update("Starting container");
        engine.start_container(&id).await.map_err(|e| {
            warn!(container = %id, error = %e, "Start failed; container left in place");
            ResourceError::internal(format!("unable to start Docker container: {e}"))
        })?;
        step.done();

        info!(container = %spec.name, id = %id, "Container started");
        Ok(DockerState::Container { id, name: spec.name })
    }

    async fn destroy(
        &self,
        ctx: &PlatformContext,
        state: &DockerState,
        log: &dyn OperationLog,
    ) -> Result<(), ResourceError> {
        let DockerState::Container { id, .. } = state else {
            return Err(ResourceError::internal("container resource holds non-container state"));
        };
        if id.is_empty() {
            return Ok(());
        }

        match ctx.engine.inspect_container(id).await {
            Err(e) if e.is_not_found() => {
                debug!(container = %id, "Container already gone");
                return Ok(());
            }
            Err(e) => debug!(container = %id, error = %e, "Inspect failed, removing anyway"),
            Ok(_) => {}
        }

        let step = Step::begin(log, format!("Deleting container: {id}"));
        match ctx.engine.remove_container(id, true).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                return Err(ResourceError::precondition(format!(
                    "unable to remove Docker container {id}: {e}"
                )))
            }
        }
        step.done();

        info!(container = %id, "Container removed");
        Ok(())
    }

    async fn status(
        &self,
        ctx: &PlatformContext,
        state: &DockerState,
        log: &dyn OperationLog,
    ) -> Result<Vec<ResourceStatus>, ResourceError> {
        let DockerState::Container { id, name } = state else {
            return Err(ResourceError::internal("container resource holds non-container state"));
        };
        let mut step = Step::begin(log, "Checking status of the Docker container resource...");
        debug!(container = %id, "Querying docker for container health");

        let mut details = match ctx.engine.inspect_container(id).await {
            Ok(details) => details,
            Err(e) if e.is_not_found() => {
                // Expected to exist; most likely removed out of band.
                step.update("Finished building report for Docker container resource");
                step.done();
                return Ok(vec![ResourceStatus::new(name.as_str(), self.category(), Health::Missing)
                    .with_id(id.as_str())]);
            }
            Err(e) => {
                return Err(ResourceError::precondition(format!(
                    "error querying docker for container status: {e}"
                )))
            }
        };

        let created_time = parse_created(&details.created)?;
        let (health, message) = container_health(&details.state);

        // Environment values may hold secrets.
        details.env.clear();

        let mut state_json = serde_json::json!({ "dockerContainerInfo": &details });
        if details.networks.len() == 1 {
            if let Some(ip) = details.networks.values().next() {
                state_json["ipAddress"] = serde_json::Value::String(ip.clone());
            }
        }

        let status = ResourceStatus {
            name: details.name.trim_start_matches('/').to_string(),
            id: details.id.clone(),
            category: self.category(),
            health,
            health_message: message.to_string(),
            created_time: Some(created_time),
            state_json: state_json.to_string(),
            ..Default::default()
        };

        step.update("Finished building report for Docker container resource");
        step.done();
        Ok(vec![status])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceLimits;
    use crate::engine::mock::{EngineOp, MockEngine};
    use crate::engine::ContainerDetails;
    use crate::model::{DeploymentConfig, JobInfo, Source};
    use resource_framework::mock::RecordingLog;
    use std::sync::Arc;

    fn inputs() -> DeployInputs {
        DeployInputs {
            deployment_id: "01h".into(),
            source: Source { app: "web".into() },
            job: JobInfo {
                workspace: "default".into(),
            },
            artifact: Artifact::new("nginx", "1.25"),
            deploy_config: DeploymentConfig {
                env: BTreeMap::from([("DB_URL".to_string(), "postgres://db".to_string())]),
            },
        }
    }

    fn context(engine: &MockEngine, config: PlatformConfig) -> PlatformContext {
        PlatformContext {
            engine: Arc::new(engine.clone()),
            config,
            inputs: Some(inputs()),
        }
    }

    fn running(id: &str) -> ContainerDetails {
        ContainerDetails {
            id: id.into(),
            name: "/web-01h".into(),
            created: "2024-05-01T10:00:00.123456789Z".into(),
            state: ContainerState {
                status: ContainerRunState::Running,
                running: true,
                ..Default::default()
            },
            env: vec!["SECRET=hunter2".into()],
            networks: BTreeMap::from([("waypoint".to_string(), "172.18.0.5".to_string())]),
            ..Default::default()
        }
    }

    async fn create(
        engine: &MockEngine,
        config: PlatformConfig,
        log: &RecordingLog,
    ) -> Result<DockerState, ResourceError> {
        let network = DockerState::Network {
            name: "waypoint".into(),
        };
        let created = CreatedStates::new(vec![("network", &network)]);
        ContainerResource
            .create(&context(engine, config), &created, log)
            .await
    }

    #[test]
    fn health_check_takes_precedence() {
        let mut state = ContainerState {
            running: true,
            health: Some(HealthCheckStatus::Unhealthy),
            ..Default::default()
        };
        assert_eq!(container_health(&state).0, Health::Down);
        state.health = Some(HealthCheckStatus::Starting);
        assert_eq!(container_health(&state).0, Health::Alive);
        state.health = Some(HealthCheckStatus::Healthy);
        assert_eq!(container_health(&state).0, Health::Ready);
        state.health = Some(HealthCheckStatus::Other);
        assert_eq!(container_health(&state).0, Health::Unknown);
    }

    #[test]
    fn run_state_without_health_check() {
        let running = ContainerState {
            running: true,
            ..Default::default()
        };
        assert_eq!(container_health(&running), (Health::Ready, "container is running"));

        let created = ContainerState {
            status: ContainerRunState::Created,
            ..Default::default()
        };
        assert_eq!(container_health(&created).0, Health::Alive);

        let restarting = ContainerState {
            restarting: true,
            exit_code: 1,
            ..Default::default()
        };
        assert_eq!(container_health(&restarting).0, Health::Alive);

        let crashed = ContainerState {
            status: ContainerRunState::Exited,
            exit_code: 137,
            ..Default::default()
        };
        assert_eq!(container_health(&crashed).0, Health::Down);

        let oom = ContainerState {
            oom_killed: true,
            ..Default::default()
        };
        assert_eq!(container_health(&oom).0, Health::Down);

        let paused = ContainerState {
            status: ContainerRunState::Paused,
            ..Default::default()
        };
        assert_eq!(container_health(&paused).0, Health::Unknown);
    }

    #[test]
    fn spec_collects_ports_env_binds_and_labels() {
        let config = PlatformConfig {
            published_ports: "8443:443/tcp".into(),
            extra_ports: vec![9090],
            static_environment: BTreeMap::from([("MODE".to_string(), "dev".to_string())]),
            binds: vec!["/data:/data".into()],
            labels: BTreeMap::from([("app".to_string(), "spoofed".to_string())]),
            resources: Some(ResourceLimits {
                memory: Some("64mb".into()),
                cpu: Some("128".into()),
            }),
            ..Default::default()
        };

        let spec = container_spec(&config, &inputs(), "waypoint").unwrap();

        assert_eq!(spec.name, "web-01h");
        assert_eq!(spec.image, "nginx:1.25");
        assert_eq!(spec.ports.get("8443/tcp").map(String::as_str), Some("443"));
        assert_eq!(spec.ports.get("9090/tcp").map(String::as_str), Some(""));
        assert_eq!(spec.ports.get("3000/tcp").map(String::as_str), Some(""));
        assert_eq!(spec.env, vec!["PORT=3000", "MODE=dev", "DB_URL=postgres://db"]);
        assert_eq!(spec.binds, vec!["web-scratch:/input", "/data:/data"]);
        assert_eq!(spec.labels["app"], "web");
        assert_eq!(spec.labels["waypoint.hashicorp.com/id"], "01h");
        assert_eq!(spec.memory, Some(64_000_000));
        assert_eq!(spec.cpu_shares, Some(128));
        assert_eq!(spec.network, "waypoint");
    }

    #[test]
    fn spec_rejects_bad_ports() {
        let config = PlatformConfig {
            published_ports: "a:b:c".into(),
            ..Default::default()
        };
        let err = container_spec(&config, &inputs(), "waypoint").unwrap_err();
        assert!(matches!(err, ResourceError::InvalidArgument(_)));
    }

    #[test]
    fn app_name_and_scratch_overrides() {
        let config = PlatformConfig {
            use_app_as_container_name: true,
            scratch_path: Some("/scratch".into()),
            service_port: 8080,
            ..Default::default()
        };
        let spec = container_spec(&config, &inputs(), "waypoint").unwrap();
        assert_eq!(spec.name, "web");
        assert_eq!(spec.binds, vec!["web-scratch:/scratch"]);
        assert_eq!(spec.env[0], "PORT=8080");
    }

    #[tokio::test]
    async fn create_pulls_creates_and_starts() {
        let engine = MockEngine::new();
        let log = RecordingLog::new();

        let state = create(&engine, PlatformConfig::default(), &log).await.unwrap();

        let DockerState::Container { id, name } = state else {
            panic!("expected container state");
        };
        assert_eq!(name, "web-01h");
        assert_eq!(engine.images(), vec!["docker.io/library/nginx:1.25"]);
        assert!(engine.container(&id).unwrap().state.running);
        assert!(log.open_steps().is_empty());
    }

    #[tokio::test]
    async fn cached_image_is_not_pulled() {
        let engine = MockEngine::new();
        engine.add_image("nginx:1.25");

        create(&engine, PlatformConfig::default(), &RecordingLog::new())
            .await
            .unwrap();
        assert_eq!(engine.count("pull_image"), 0);

        let forced = PlatformConfig {
            force_pull: true,
            ..Default::default()
        };
        create(&engine, forced, &RecordingLog::new()).await.unwrap();
        assert_eq!(engine.count("pull_image"), 1);
    }

    #[tokio::test]
    async fn pull_failure_aborts_before_create() {
        let engine = MockEngine::new();
        engine.fail_on(EngineOp::PullImage, "manifest unknown");
        let log = RecordingLog::new();

        let err = create(&engine, PlatformConfig::default(), &log).await.unwrap_err();

        assert!(matches!(err, ResourceError::FailedPrecondition(_)));
        assert_eq!(engine.count("create_container"), 0);
        assert!(log.open_steps().is_empty());
    }

    #[tokio::test]
    async fn failed_network_connect_marks_step_error() {
        let engine = MockEngine::new();
        engine.fail_on(EngineOp::ConnectNetwork, "network backend not found");
        let log = RecordingLog::new();
        let config = PlatformConfig {
            networks: vec!["backend".into()],
            ..Default::default()
        };

        let err = create(&engine, config, &log).await.unwrap_err();

        assert!(matches!(err, ResourceError::Internal(_)));
        assert!(log
            .events()
            .iter()
            .any(|e| matches!(e, resource_framework::mock::LogEvent::Status { status: StepStatus::Error, .. })));
        assert_eq!(engine.count("start_container"), 0);
    }

    #[tokio::test]
    async fn create_without_network_state_is_internal() {
        let engine = MockEngine::new();
        let created = CreatedStates::default();
        let err = ContainerResource
            .create(&context(&engine, PlatformConfig::default()), &created, &RecordingLog::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::Internal(_)));
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let engine = MockEngine::new();
        engine.insert_container(running("abc"));
        let ctx = context(&engine, PlatformConfig::default());
        let state = DockerState::Container {
            id: "abc".into(),
            name: "web-01h".into(),
        };

        ContainerResource.destroy(&ctx, &state, &RecordingLog::new()).await.unwrap();
        ContainerResource.destroy(&ctx, &state, &RecordingLog::new()).await.unwrap();

        assert_eq!(engine.count("remove_container"), 1);
        assert!(engine.container("abc").is_none());
    }

    #[tokio::test]
    async fn status_redacts_env_and_extracts_ip() {
        let engine = MockEngine::new();
        engine.insert_container(running("abc"));
        let state = DockerState::Container {
            id: "abc".into(),
            name: "web-01h".into(),
        };

        let statuses = ContainerResource
            .status(&context(&engine, PlatformConfig::default()), &state, &RecordingLog::new())
            .await
            .unwrap();

        let status = &statuses[0];
        assert_eq!(status.name, "web-01h");
        assert_eq!(status.health, Health::Ready);
        assert!(!status.state_json.contains("hunter2"));
        let json: serde_json::Value = serde_json::from_str(&status.state_json).unwrap();
        assert_eq!(json["ipAddress"], "172.18.0.5");
        assert_eq!(json["dockerContainerInfo"]["env"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn status_of_removed_container_is_missing() {
        let engine = MockEngine::new();
        let state = DockerState::Container {
            id: "gone".into(),
            name: "web-01h".into(),
        };

        let statuses = ContainerResource
            .status(&context(&engine, PlatformConfig::default()), &state, &RecordingLog::new())
            .await
            .unwrap();

        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].health, Health::Missing);
        assert_eq!(statuses[0].id, "gone");
    }

    #[tokio::test]
    async fn bad_timestamp_is_internal() {
        let engine = MockEngine::new();
        let mut details = running("abc");
        details.created = "yesterday".into();
        engine.insert_container(details);
        let state = DockerState::Container {
            id: "abc".into(),
            name: String::new(),
        };

        let err = ContainerResource
            .status(&context(&engine, PlatformConfig::default()), &state, &RecordingLog::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::Internal(_)));
    }
}
