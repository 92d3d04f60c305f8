//! # Deployment Orchestration
//!
//! [`Platform`] is the entry point a host calls. Each call builds its own
//! resource manager, so nothing is shared between invocations except the
//! engine client.
//!
//! | Call | Manager pass | Persisted output |
//! |------|--------------|------------------|
//! | [`Platform::deploy`] | `create_all` (network, then container) | a new [`Deployment`] with its snapshot |
//! | [`Platform::status`] | `status_report` | nothing |
//! | [`Platform::destroy`] | `destroy_all` (container, then network) | nothing |
//!
//! Status and destroy restore the manager from the deployment's snapshot.
//! Deployments recorded before snapshots existed only know their container
//! id; for those the two states are synthesized.

use crate::config::PlatformConfig;
use crate::engine::{ContainerEngine, DockerEngine};
use crate::error::PlatformError;
use crate::model::{Artifact, Deployment, DeploymentConfig, JobInfo, Source};
use crate::resources::{ContainerResource, DeployInputs, NetworkResource, PlatformContext};
use crate::state::{DockerState, NETWORK_NAME};
use resource_framework::{Health, OperationLog, ResourceManager, StatusReport, Step, StepStatus};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// The manager type every dockerdev call runs on.
pub type DockerResources = ResourceManager<PlatformContext, DockerState>;

const NOT_READY_ADVISORY: &str = "The current deployment is not ready, however your application \
     might be available or still starting up.";

/// Deploys, inspects and tears down applications on a container engine.
#[derive(Clone)]
pub struct Platform {
    config: PlatformConfig,
    engine: Arc<dyn ContainerEngine>,
}

impl Platform {
    pub fn new(config: PlatformConfig, engine: Arc<dyn ContainerEngine>) -> Self {
        Self { config, engine }
    }

    /// Connects to Docker using the config's client overrides.
    pub async fn connect(config: PlatformConfig) -> Result<Self, PlatformError> {
        let engine = DockerEngine::connect(config.client_config.as_ref()).await?;
        Ok(Self::new(config, Arc::new(engine)))
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// A fresh manager holding the network and container resources, in creation order.
    pub fn resource_manager() -> Result<DockerResources, PlatformError> {
        let mut manager = DockerResources::new();
        manager.register(NetworkResource)?;
        manager.register(ContainerResource)?;
        Ok(manager)
    }

    /// Rebuilds the manager state recorded for `deployment`.
    pub fn restore(deployment: &Deployment) -> Result<DockerResources, PlatformError> {
        let mut manager = Self::resource_manager()?;
        match &deployment.resource_state {
            Some(snapshot) => manager.load_state(snapshot)?,
            None => {
                debug!(deployment = %deployment.id, "No snapshot; synthesizing legacy state");
                manager.set_state(
                    "network",
                    DockerState::Network {
                        name: NETWORK_NAME.to_string(),
                    },
                )?;
                manager.set_state(
                    "container",
                    DockerState::Container {
                        id: deployment.container.clone(),
                        name: String::new(),
                    },
                )?;
            }
        }
        Ok(manager)
    }

    fn context(&self, inputs: Option<DeployInputs>) -> PlatformContext {
        PlatformContext {
            engine: self.engine.clone(),
            config: self.config.clone(),
            inputs,
        }
    }

    /// Creates the network (if needed) and a new container for `artifact`.
    ///
    /// Fails fast: when a resource fails, earlier ones stay provisioned and
    /// no deployment is returned.
    #[instrument(skip_all, fields(app = %source.app, image = %artifact.reference()))]
    pub async fn deploy(
        &self,
        source: &Source,
        job: &JobInfo,
        artifact: &Artifact,
        deploy_config: &DeploymentConfig,
        log: &dyn OperationLog,
    ) -> Result<Deployment, PlatformError> {
        let mut deployment = Deployment::new(source.app.as_str());
        let ctx = self.context(Some(DeployInputs {
            deployment_id: deployment.id.clone(),
            source: source.clone(),
            job: job.clone(),
            artifact: artifact.clone(),
            deploy_config: deploy_config.clone(),
        }));

        let mut manager = Self::resource_manager()?;
        if let Err(e) = manager.create_all(&ctx, log).await {
            warn!(deployment = %deployment.id, error = %e, "Deploy failed");
            return Err(e.into());
        }

        deployment.resource_state = Some(manager.snapshot()?);
        let name = match manager.state("container")? {
            DockerState::Container { id, name } if !id.is_empty() => {
                deployment.container = id.clone();
                name.clone()
            }
            _ => {
                return Err(PlatformError::Internal(
                    "container state is empty; this is likely an internal bug".to_string(),
                ))
            }
        };

        Step::begin(log, format!("App deployed as container: {name}")).done();
        info!(deployment = %deployment.id, container = %deployment.container, "Deployed");
        Ok(deployment)
    }

    /// Reports the health of every resource behind `deployment`.
    ///
    /// A deployment that is not ready is reported, never an error.
    #[instrument(skip_all, fields(deployment = %deployment.id))]
    pub async fn status(
        &self,
        deployment: &Deployment,
        log: &dyn OperationLog,
    ) -> Result<StatusReport, PlatformError> {
        let mut step = Step::begin(log, "Gathering health report for Docker platform...");

        let manager = Self::restore(deployment)?;
        let report = manager.status_report(&self.context(None), log).await?;

        step.update("Finished building report for Docker platform");
        step.done();

        log.summary(summary_status(report.health), &report.health_message);
        if report.health != Health::Ready {
            log.summary(StepStatus::Warn, NOT_READY_ADVISORY);
        }

        debug!(health = %report.health, "Status reported");
        Ok(report)
    }

    /// Removes the deployment's container. The shared network is kept.
    #[instrument(skip_all, fields(deployment = %deployment.id))]
    pub async fn destroy(&self, deployment: &Deployment, log: &dyn OperationLog) -> Result<(), PlatformError> {
        let mut manager = Self::restore(deployment)?;
        manager.destroy_all(&self.context(None), log).await?;
        info!("Deployment destroyed");
        Ok(())
    }
}

fn summary_status(health: Health) -> StepStatus {
    match health {
        Health::Ready => StepStatus::Ok,
        Health::Partial => StepStatus::Warn,
        _ => StepStatus::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resource_framework::ManagerError;

    #[test]
    fn summary_follows_health() {
        assert_eq!(summary_status(Health::Ready), StepStatus::Ok);
        assert_eq!(summary_status(Health::Partial), StepStatus::Warn);
        assert_eq!(summary_status(Health::Down), StepStatus::Error);
        assert_eq!(summary_status(Health::Missing), StepStatus::Error);
    }

    #[test]
    fn legacy_restore_synthesizes_both_states() {
        let deployment = Deployment {
            id: "1".into(),
            name: "web".into(),
            container: "abc".into(),
            resource_state: None,
        };

        let manager = Platform::restore(&deployment).unwrap();

        assert_eq!(
            manager.state("network").unwrap(),
            &DockerState::Network {
                name: "waypoint".into()
            }
        );
        assert!(matches!(
            manager.state("container").unwrap(),
            DockerState::Container { id, .. } if id == "abc"
        ));
    }

    #[test]
    fn snapshot_with_foreign_resource_is_rejected() {
        let mut snapshot = Platform::resource_manager().unwrap().snapshot().unwrap();
        snapshot.resources[0].name = "volume".into();
        let deployment = Deployment {
            resource_state: Some(snapshot),
            ..Default::default()
        };

        let err = Platform::restore(&deployment).err().unwrap();
        assert!(matches!(
            err,
            PlatformError::Manager(ManagerError::UnknownResource(ref n)) if n == "volume"
        ));
    }
}
