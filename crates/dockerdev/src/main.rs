use dockerdev::model::{Artifact, DeploymentConfig, JobInfo, Source};
use dockerdev::{Platform, PlatformConfig};
use resource_framework::tracing::setup_tracing;
use resource_framework::TracingLog;
use std::path::PathBuf;
use tracing::{error, info};

/// Deploys `IMAGE [TAG] [APP]` to the local Docker daemon and prints the
/// resulting deployment and its status as JSON.
///
/// Configuration is read from the file named by `DOCKERDEV_CONFIG`, if set,
/// overlaid with `DOCKERDEV_*` variables.
#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let mut args = std::env::args().skip(1);
    let Some(image) = args.next() else {
        return Err("usage: dockerdev IMAGE [TAG] [APP]".to_string());
    };
    let tag = args.next().unwrap_or_else(|| "latest".to_string());
    let app = args.next().unwrap_or_else(|| "app".to_string());

    let config_path = std::env::var_os("DOCKERDEV_CONFIG").map(PathBuf::from);
    let config = PlatformConfig::load(config_path.as_deref()).map_err(|e| e.to_string())?;
    let platform = Platform::connect(config).await.map_err(|e| e.to_string())?;

    let log = TracingLog;
    let source = Source { app };
    let job = JobInfo {
        workspace: "default".to_string(),
    };
    let artifact = Artifact::new(image, tag);

    let deployment = platform
        .deploy(&source, &job, &artifact, &DeploymentConfig::default(), &log)
        .await
        .map_err(|e| {
            error!(code = ?e.code(), error = %e, "Deploy failed");
            e.to_string()
        })?;
    info!(deployment = %deployment.id, "Deployment created");
    println!("{}", deployment.to_json().map_err(|e| e.to_string())?);

    let report = platform.status(&deployment, &log).await.map_err(|e| e.to_string())?;
    println!(
        "{}",
        serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?
    );

    Ok(())
}
