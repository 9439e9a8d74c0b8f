//! Container configuration builders.
//!
//! Provides a fluent API for describing the database container: image,
//! environment, published port and volume binds.

use crate::container::{ContainerError, Result};
use crate::settings::{ContainerPort, Settings};
use bollard::service::{ContainerInspectResponse, HostConfig, PortBinding, PortMap};
use std::collections::HashMap;

/// Label set on every container this crate creates.
pub const MANAGED_LABEL: &str = "docker-db.managed";

/// Container configuration builder.
pub struct ContainerConfigBuilder {
    image: Option<String>,
    env: Vec<String>,
    labels: HashMap<String, String>,
    binds: Vec<String>,
    exposed_ports: Vec<String>,
    port_bindings: HashMap<String, Option<Vec<PortBinding>>>,
}

impl Default for ContainerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerConfigBuilder {
    /// Create a new container configuration builder.
    pub fn new() -> Self {
        Self {
            image: None,
            env: Vec::new(),
            labels: HashMap::new(),
            binds: Vec::new(),
            exposed_ports: Vec::new(),
            port_bindings: HashMap::new(),
        }
    }

    /// Set the container image.
    pub fn image<S: Into<String>>(mut self, image: S) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Add an environment variable.
    pub fn env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.env.push(format!("{}={}", key.into(), value.into()));
        self
    }

    /// Add multiple environment variables.
    pub fn envs<I, K, V>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in envs {
            self.env.push(format!("{}={}", k.into(), v.into()));
        }
        self
    }

    /// Add a label to the container.
    pub fn label<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Add a volume bind (source:target:mode).
    pub fn bind<S: Into<String>>(mut self, bind: S) -> Self {
        self.binds.push(bind.into());
        self
    }

    /// Publish a container port on a host port, on all host interfaces.
    pub fn port_binding(mut self, container_port: &ContainerPort, host_port: u16) -> Self {
        let key = container_port.to_string();
        self.exposed_ports.push(key.clone());
        self.port_bindings.insert(
            key,
            Some(vec![PortBinding {
                host_ip: Some("0.0.0.0".to_string()),
                host_port: Some(host_port.to_string()),
            }]),
        );
        self
    }

    /// Build the container configuration.
    ///
    /// # Errors
    ///
    /// Returns error if no image was set.
    pub fn build(self) -> Result<ContainerConfig> {
        let image = self
            .image
            .ok_or_else(|| ContainerError::ConfigError("Image is required".to_string()))?;

        let host_config = HostConfig {
            binds: if self.binds.is_empty() {
                None
            } else {
                Some(self.binds)
            },
            port_bindings: if self.port_bindings.is_empty() {
                None
            } else {
                Some(self.port_bindings)
            },
            ..Default::default()
        };

        Ok(ContainerConfig {
            image,
            env: if self.env.is_empty() {
                None
            } else {
                Some(self.env)
            },
            labels: if self.labels.is_empty() {
                None
            } else {
                Some(self.labels)
            },
            exposed_ports: self.exposed_ports,
            host_config,
        })
    }
}

/// Container configuration.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// Image name
    pub image: String,
    /// Environment variables (`KEY=VALUE`)
    pub env: Option<Vec<String>>,
    /// Labels
    pub labels: Option<HashMap<String, String>>,
    /// Exposed ports (`5432/tcp`)
    pub exposed_ports: Vec<String>,
    /// Host configuration (binds, port bindings)
    pub host_config: HostConfig,
}

impl ContainerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ContainerConfigBuilder {
        ContainerConfigBuilder::new()
    }

    /// Describe the database container for `settings`, running `image`.
    ///
    /// Every volume mount becomes a bind, named volumes included.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is incomplete.
    pub fn for_database(settings: &Settings, image: &str) -> Result<Self> {
        let mut builder = Self::builder()
            .image(image)
            .envs(settings.env().iter().cloned())
            .label(MANAGED_LABEL, "true")
            .port_binding(settings.container_port(), settings.host_port());

        for mount in settings.volumes() {
            builder = builder.bind(mount.bind_spec());
        }

        builder.build()
    }

    /// Host port published for `container_port`, if any.
    pub fn published_port(&self, container_port: &ContainerPort) -> Option<&str> {
        host_port_in(self.host_config.port_bindings.as_ref()?, container_port)
    }

    /// Bind specifications, in mount order.
    pub fn binds(&self) -> &[String] {
        self.host_config.binds.as_deref().unwrap_or_default()
    }
}

/// Host port an existing container publishes `container_port` on.
///
/// Reads the bindings recorded at creation first, then the live network
/// settings (only populated while the container runs).
pub fn published_host_port(
    inspect: &ContainerInspectResponse,
    container_port: &ContainerPort,
) -> Option<u16> {
    let created = inspect
        .host_config
        .as_ref()
        .and_then(|host| host.port_bindings.as_ref());
    let live = inspect
        .network_settings
        .as_ref()
        .and_then(|network| network.ports.as_ref());

    [created, live]
        .into_iter()
        .flatten()
        .filter_map(|bindings| host_port_in(bindings, container_port))
        .find_map(|port| port.parse().ok())
}

fn host_port_in<'a>(bindings: &'a PortMap, container_port: &ContainerPort) -> Option<&'a str> {
    bindings
        .get(&container_port.to_string())?
        .as_ref()?
        .iter()
        .find_map(|binding| binding.host_port.as_deref().filter(|port| !port.is_empty()))
}
