//! # Platform Configuration
//!
//! [`PlatformConfig`] mirrors the `deploy { use "dockerdev" { ... } }` block of
//! an application's configuration. Every field is optional.
//!
//! Values are layered with the `config` crate: an optional file (toml, yaml
//! or json, picked by extension) first, then `DOCKERDEV_*` environment
//! variables. Nested keys use a double underscore, e.g.
//! `DOCKERDEV_CLIENT_CONFIG__HOST=tcp://10.0.0.5:2376`.

use crate::error::PlatformError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_SERVICE_PORT: u16 = 3000;
pub const DEFAULT_SCRATCH_PATH: &str = "/input";
const ENV_PREFIX: &str = "DOCKERDEV";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Extra bind mounts, `host:container[:mode]`.
    pub binds: Vec<String>,

    /// Engine connection overrides. When absent the client is configured
    /// from `DOCKER_HOST` and friends.
    pub client_config: Option<ClientConfig>,

    /// Replaces the image's command. Arguments are not passed through a shell.
    pub command: Vec<String>,

    /// Pull the image even when it is already in the local cache.
    pub force_pull: bool,

    /// User labels for the container. The system keys always win.
    pub labels: BTreeMap<String, String>,

    /// Networks the container is connected to after creation.
    pub networks: Vec<String>,

    pub resources: Option<ResourceLimits>,

    /// Mount target of the `<app>-scratch` volume. Defaults to `/input`.
    pub scratch_path: Option<String>,

    pub static_environment: BTreeMap<String, String>,

    /// Additional container ports, each published on a random host port.
    pub extra_ports: Vec<u16>,

    /// Port the application listens on inside the container. 0 means unset.
    pub service_port: u16,

    /// Comma-separated `containerPort[:hostPort][/proto]` entries.
    pub published_ports: String,

    /// Name the container after the app instead of `<app>-<deployment id>`.
    pub use_app_as_container_name: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    /// Directory holding `ca.pem`, `cert.pem` and `key.pem`.
    pub cert_path: String,
    pub api_version: String,
}

/// Container limits. Memory is a human size (`"512MB"`), cpu an integer
/// number of shares.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    pub memory: Option<String>,
    pub cpu: Option<String>,
}

impl PlatformConfig {
    /// Loads the configuration from `path` (if given) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, PlatformError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Parses a configuration document of the given format, ignoring the environment.
    pub fn from_document(contents: &str, format: config::FileFormat) -> Result<Self, PlatformError> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(contents, format))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn effective_service_port(&self) -> u16 {
        if self.service_port == 0 {
            DEFAULT_SERVICE_PORT
        } else {
            self.service_port
        }
    }

    pub fn scratch_target(&self) -> &str {
        match self.scratch_path.as_deref() {
            Some(path) if !path.is_empty() => path,
            _ => DEFAULT_SCRATCH_PATH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = PlatformConfig::from_document("", config::FileFormat::Toml).unwrap();
        assert_eq!(cfg, PlatformConfig::default());
        assert_eq!(cfg.effective_service_port(), 3000);
        assert_eq!(cfg.scratch_target(), "/input");
    }

    #[test]
    fn parses_every_section() {
        let cfg = PlatformConfig::from_document(
            r#"
            binds = ["/data:/data"]
            command = ["./server", "--verbose"]
            force_pull = true
            networks = ["backend"]
            service_port = 8080
            extra_ports = [9090]
            published_ports = "3000:3001/tcp,8080:80"
            scratch_path = "/scratch"

            [labels]
            team = "payments"

            [static_environment]
            MODE = "dev"

            [resources]
            memory = "512MB"
            cpu = "256"

            [client_config]
            host = "tcp://10.0.0.5:2376"
            cert_path = "/certs"
            "#,
            config::FileFormat::Toml,
        )
        .unwrap();

        assert_eq!(cfg.effective_service_port(), 8080);
        assert_eq!(cfg.scratch_target(), "/scratch");
        assert_eq!(cfg.labels.get("team").map(String::as_str), Some("payments"));
        assert_eq!(cfg.resources.unwrap().memory.as_deref(), Some("512MB"));
        let client = cfg.client_config.unwrap();
        assert_eq!(client.cert_path, "/certs");
        assert!(client.api_version.is_empty());
    }

    #[test]
    fn yaml_is_accepted() {
        let cfg = PlatformConfig::from_document(
            "use_app_as_container_name: true\nnetworks: [a, b]\n",
            config::FileFormat::Yaml,
        )
        .unwrap();
        assert!(cfg.use_app_as_container_name);
        assert_eq!(cfg.networks, vec!["a", "b"]);
    }
}
