//! Records exchanged with the host: deploy inputs in, deployments out.

pub mod deployment;
pub mod inputs;

pub use deployment::Deployment;
pub use inputs::{Artifact, DeploymentConfig, JobInfo, Source};
