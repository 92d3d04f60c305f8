//! [`ContainerEngine`] backed by a Docker daemon through bollard.

use super::{
    ContainerCreate, ContainerDetails, ContainerEngine, ContainerRunState, ContainerState,
    HealthCheckStatus, NetworkCreate, NetworkSummary, PullProgress,
};
use crate::config::ClientConfig;
use crate::error::EngineError;
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, NetworkingConfig,
    RemoveContainerOptions, StartContainerOptions,
};
use bollard::image::{CreateImageOptions, ListImagesOptions};
use bollard::models::{ContainerStateStatusEnum, EndpointSettings, HealthStatusEnum};
use bollard::network::{ConnectNetworkOptions, CreateNetworkOptions, ListNetworksOptions};
use bollard::service::{HostConfig, PortBinding};
use bollard::{ClientVersion, Docker, API_DEFAULT_VERSION};
use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

const CONNECT_TIMEOUT_SECS: u64 = 120;

/// A connected, version-negotiated Docker client.
#[derive(Debug, Clone)]
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connects using `client` overrides, or the `DOCKER_*` environment when absent.
    pub async fn connect(client: Option<&ClientConfig>) -> Result<Self, EngineError> {
        let docker = match client {
            None => Docker::connect_with_defaults(),
            Some(cfg) => connect_with(cfg),
        }
        .map_err(|e| EngineError::Connection(e.to_string()))?;

        let docker = docker
            .negotiate_version()
            .await
            .map_err(|e| EngineError::Connection(e.to_string()))?;

        info!("Connected to Docker daemon");
        Ok(Self { docker })
    }
}

fn connect_with(cfg: &ClientConfig) -> Result<Docker, bollard::errors::Error> {
    let parsed = parse_api_version(&cfg.api_version);
    let version: &ClientVersion = parsed.as_ref().unwrap_or(API_DEFAULT_VERSION);

    match endpoint(cfg, std::env::var("DOCKER_HOST").ok()) {
        Endpoint::Ssl { host, certs } => Docker::connect_with_ssl(
            &host,
            &certs.join("key.pem"),
            &certs.join("cert.pem"),
            &certs.join("ca.pem"),
            CONNECT_TIMEOUT_SECS,
            version,
        ),
        Endpoint::Local(addr) => Docker::connect_with_local(&addr, CONNECT_TIMEOUT_SECS, version),
        Endpoint::Http(host) => Docker::connect_with_http(&host, CONNECT_TIMEOUT_SECS, version),
    }
}

#[cfg(unix)]
const DEFAULT_LOCAL_ADDR: &str = "unix:///var/run/docker.sock";
#[cfg(windows)]
const DEFAULT_LOCAL_ADDR: &str = "npipe:////./pipe/docker_engine";
const DEFAULT_TLS_ADDR: &str = "tcp://localhost:2376";

/// Where and how to reach the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Endpoint {
    Ssl { host: String, certs: PathBuf },
    Local(String),
    Http(String),
}

/// Picks the endpoint for `cfg`; an empty host falls back to `docker_host`,
/// then to the platform default.
fn endpoint(cfg: &ClientConfig, docker_host: Option<String>) -> Endpoint {
    let host = if cfg.host.is_empty() {
        docker_host.filter(|h| !h.is_empty())
    } else {
        Some(cfg.host.clone())
    };

    if !cfg.cert_path.is_empty() {
        return Endpoint::Ssl {
            host: host.unwrap_or_else(|| DEFAULT_TLS_ADDR.to_string()),
            certs: PathBuf::from(&cfg.cert_path),
        };
    }

    match host {
        None => Endpoint::Local(DEFAULT_LOCAL_ADDR.to_string()),
        Some(h) if h.starts_with("unix://") || h.starts_with("npipe://") => Endpoint::Local(h),
        Some(h) => Endpoint::Http(h),
    }
}

/// Parses `"1.43"` into a client version.
fn parse_api_version(value: &str) -> Option<ClientVersion> {
    let (major, minor) = value.trim().split_once('.')?;
    Some(ClientVersion {
        major_version: major.parse().ok()?,
        minor_version: minor.parse().ok()?,
    })
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn run_state(status: Option<ContainerStateStatusEnum>) -> ContainerRunState {
    match status {
        Some(ContainerStateStatusEnum::CREATED) => ContainerRunState::Created,
        Some(ContainerStateStatusEnum::RUNNING) => ContainerRunState::Running,
        Some(ContainerStateStatusEnum::PAUSED) => ContainerRunState::Paused,
        Some(ContainerStateStatusEnum::RESTARTING) => ContainerRunState::Restarting,
        Some(ContainerStateStatusEnum::REMOVING) => ContainerRunState::Removing,
        Some(ContainerStateStatusEnum::EXITED) => ContainerRunState::Exited,
        Some(ContainerStateStatusEnum::DEAD) => ContainerRunState::Dead,
        _ => ContainerRunState::Unknown,
    }
}

fn health_check(status: Option<HealthStatusEnum>) -> HealthCheckStatus {
    match status {
        Some(HealthStatusEnum::HEALTHY) => HealthCheckStatus::Healthy,
        Some(HealthStatusEnum::UNHEALTHY) => HealthCheckStatus::Unhealthy,
        Some(HealthStatusEnum::STARTING) => HealthCheckStatus::Starting,
        _ => HealthCheckStatus::Other,
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn list_networks(&self, label: &str) -> Result<Vec<NetworkSummary>, EngineError> {
        let filters = HashMap::from([("label", vec![label])]);
        let networks = self
            .docker
            .list_networks(Some(ListNetworksOptions { filters }))
            .await?;

        Ok(networks
            .into_iter()
            .map(|n| NetworkSummary {
                id: n.id.unwrap_or_default(),
                name: n.name.unwrap_or_default(),
                driver: n.driver.unwrap_or_default(),
                labels: n.labels.unwrap_or_default().into_iter().collect(),
                created: n.created.map(|c| c.to_string()).as_deref().and_then(parse_timestamp),
            })
            .collect())
    }

    async fn create_network(&self, spec: &NetworkCreate) -> Result<String, EngineError> {
        let options = CreateNetworkOptions {
            name: spec.name.as_str(),
            driver: spec.driver.as_str(),
            check_duplicate: true,
            attachable: spec.attachable,
            labels: spec
                .labels
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
            ..Default::default()
        };
        let response = self.docker.create_network(options).await?;
        debug!(network = %spec.name, id = %response.id, "Created network");
        Ok(response.id)
    }

    async fn connect_network(&self, network: &str, container_id: &str) -> Result<(), EngineError> {
        let options = ConnectNetworkOptions {
            container: container_id,
            endpoint_config: EndpointSettings::default(),
        };
        self.docker.connect_network(network, options).await?;
        Ok(())
    }

    async fn list_images(&self, reference: &str) -> Result<Vec<String>, EngineError> {
        let options = ListImagesOptions::<String> {
            filters: HashMap::from([("reference".to_string(), vec![reference.to_string()])]),
            ..Default::default()
        };
        let images = self.docker.list_images(Some(options)).await?;
        Ok(images.into_iter().map(|i| i.id).collect())
    }

    fn pull_image<'a>(&'a self, reference: &str) -> BoxStream<'a, Result<PullProgress, EngineError>> {
        let options = CreateImageOptions {
            from_image: reference.to_string(),
            ..Default::default()
        };
        self.docker
            .create_image(Some(options), None, None)
            .map(|item| {
                let info = item?;
                if let Some(message) = info.error {
                    return Err(EngineError::Api(message));
                }
                Ok(PullProgress {
                    status: info.status.unwrap_or_default(),
                    progress: info.progress,
                })
            })
            .boxed()
    }

    async fn create_container(&self, spec: &ContainerCreate) -> Result<String, EngineError> {
        let exposed_ports: HashMap<String, HashMap<(), ()>> = spec
            .ports
            .keys()
            .map(|key| (key.clone(), HashMap::new()))
            .collect();

        let port_bindings: HashMap<String, Option<Vec<PortBinding>>> = spec
            .ports
            .iter()
            .map(|(key, host_port)| {
                let binding = PortBinding {
                    host_ip: None,
                    host_port: (!host_port.is_empty()).then(|| host_port.clone()),
                };
                (key.clone(), Some(vec![binding]))
            })
            .collect();

        let host_config = HostConfig {
            binds: Some(spec.binds.clone()),
            port_bindings: Some(port_bindings),
            memory: spec.memory,
            cpu_shares: spec.cpu_shares,
            ..Default::default()
        };

        let config = Config {
            attach_stdin: Some(true),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            open_stdin: Some(true),
            stdin_once: Some(true),
            image: Some(spec.image.clone()),
            cmd: (!spec.command.is_empty()).then(|| spec.command.clone()),
            env: Some(spec.env.clone()),
            labels: Some(spec.labels.clone().into_iter().collect()),
            exposed_ports: Some(exposed_ports),
            host_config: Some(host_config),
            networking_config: Some(NetworkingConfig {
                endpoints_config: HashMap::from([(spec.network.clone(), EndpointSettings::default())]),
            }),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: spec.name.as_str(),
            platform: None,
        };

        let response = self.docker.create_container(Some(options), config).await?;
        debug!(container = %spec.name, id = %response.id, "Created container");
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, EngineError> {
        let info = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?;

        let state = info.state.unwrap_or_default();
        let config = info.config.unwrap_or_default();
        let networks = info
            .network_settings
            .and_then(|s| s.networks)
            .unwrap_or_default()
            .into_iter()
            .map(|(name, endpoint)| (name, endpoint.ip_address.unwrap_or_default()))
            .collect();

        Ok(ContainerDetails {
            id: info.id.unwrap_or_default(),
            name: info.name.unwrap_or_default(),
            image: config.image.unwrap_or_default(),
            created: info.created.map(|c| c.to_string()).unwrap_or_default(),
            state: ContainerState {
                status: run_state(state.status),
                running: state.running.unwrap_or(false),
                restarting: state.restarting.unwrap_or(false),
                oom_killed: state.oom_killed.unwrap_or(false),
                dead: state.dead.unwrap_or(false),
                exit_code: state.exit_code.unwrap_or(0),
                health: state.health.map(|h| health_check(h.status)),
            },
            env: config.env.unwrap_or_default(),
            labels: config.labels.unwrap_or_default().into_iter().collect(),
            networks,
        })
    }

    async fn remove_container(&self, id: &str, force: bool) -> Result<(), EngineError> {
        let options = RemoveContainerOptions {
            force,
            ..Default::default()
        };
        self.docker.remove_container(id, Some(options)).await?;
        Ok(())
    }
}
