//! Docker/Podman client.
//!
//! Connects to the local container runtime (Docker first, then the Podman
//! sockets) and implements [`ContainerEngine`] on top of the bollard API.

use crate::container::{
    ContainerConfig, ContainerEngine, ContainerError, ContainerSummary, ImageBuilder, Result,
    VolumeManager,
};
use crate::settings::BuildSpec;
use async_trait::async_trait;
use bollard::Docker;
use bollard::models::ContainerInspectResponse;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Docker/Podman API client.
#[derive(Clone)]
pub struct ContainerClient {
    docker: Arc<Docker>,
}

impl ContainerClient {
    /// Connect to the local container runtime and verify it answers.
    ///
    /// # Errors
    ///
    /// Returns error if neither Docker nor Podman are reachable.
    pub async fn new() -> Result<Self> {
        let client = Self::from_docker(Self::connect()?);
        client.ping().await?;
        Ok(client)
    }

    /// Wrap an existing bollard connection.
    pub fn from_docker(docker: Docker) -> Self {
        Self {
            docker: Arc::new(docker),
        }
    }

    /// Connect to Docker or Podman daemon.
    ///
    /// Tries, in order: local defaults (Unix socket, named pipe or
    /// `DOCKER_HOST`), the rootless Podman socket, the system Podman socket.
    fn connect() -> Result<Docker> {
        debug!("Attempting to connect to container runtime...");

        match Docker::connect_with_local_defaults() {
            Ok(docker) => {
                info!("Connected to container runtime via local defaults");
                return Ok(docker);
            }
            Err(e) => {
                debug!("Local defaults failed: {}", e);
            }
        }

        #[cfg(unix)]
        {
            let mut sockets = Vec::new();
            if let Ok(home) = std::env::var("HOME") {
                sockets.push(format!("unix://{}/run/podman/podman.sock", home));
            }
            sockets.push("unix:///run/podman/podman.sock".to_string());

            for socket in sockets {
                debug!("Trying Podman socket: {}", socket);
                match Docker::connect_with_socket(&socket, 120, bollard::API_DEFAULT_VERSION) {
                    Ok(docker) => {
                        info!("Connected to Podman via {}", socket);
                        return Ok(docker);
                    }
                    Err(e) => {
                        debug!("Podman socket {} failed: {}", socket, e);
                    }
                }
            }
        }

        Err(ContainerError::Other(
            "Failed to connect to Docker or Podman. Please ensure Docker or Podman is installed and running.".to_string()
        ))
    }

    /// Ping the container runtime to verify connectivity.
    ///
    /// # Errors
    ///
    /// Returns error if ping fails.
    pub async fn ping(&self) -> Result<()> {
        self.docker.ping().await.map_err(|e| {
            ContainerError::Other(format!("Failed to ping container runtime: {}", e))
        })?;
        debug!("Container runtime ping successful");
        Ok(())
    }

    /// Get the underlying Docker client.
    pub fn docker(&self) -> &Docker {
        &self.docker
    }

    fn images(&self) -> ImageBuilder {
        ImageBuilder::new(self.docker.as_ref().clone())
    }

    fn volumes(&self) -> VolumeManager {
        VolumeManager::new(self.docker.as_ref().clone())
    }
}

#[async_trait]
impl ContainerEngine for ContainerClient {
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>> {
        let containers = self
            .docker
            .list_containers(Some(bollard::container::ListContainersOptions::<String> {
                all: true,
                filters: HashMap::new(),
                ..Default::default()
            }))
            .await?;

        Ok(containers
            .into_iter()
            .map(|c| ContainerSummary {
                id: c.id.unwrap_or_default(),
                names: c.names.unwrap_or_default(),
                image: c.image.unwrap_or_default(),
            })
            .collect())
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        self.images().pull(image).await
    }

    async fn build_image(&self, spec: &BuildSpec) -> Result<()> {
        self.images().build(spec).await.map(|_| ())
    }

    async fn volume_exists(&self, name: &str) -> Result<bool> {
        self.volumes().volume_exists(name).await
    }

    async fn create_volume(&self, name: &str) -> Result<()> {
        self.volumes().create_volume(name).await.map(|_| ())
    }

    async fn create_container(&self, name: &str, config: &ContainerConfig) -> Result<String> {
        use bollard::container::Config as BollardConfig;

        debug!("Creating container: {}", name);

        let options = bollard::container::CreateContainerOptions {
            name,
            ..Default::default()
        };

        let exposed_ports = config
            .exposed_ports
            .iter()
            .map(|port| (port.clone(), HashMap::new()))
            .collect::<HashMap<_, _>>();

        let bollard_config = BollardConfig {
            image: Some(config.image.clone()),
            env: config.env.clone(),
            labels: config.labels.clone(),
            exposed_ports: Some(exposed_ports),
            host_config: Some(config.host_config.clone()),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(Some(options), bollard_config)
            .await?;

        info!("Created container: {} ({})", name, response.id);
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        debug!("Starting container: {}", id);

        match self
            .docker
            .start_container(id, None::<bollard::container::StartContainerOptions<String>>)
            .await
        {
            Ok(()) => {}
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 304, ..
            }) => {
                debug!("Container {} already running", id);
            }
            Err(e) => return Err(ContainerError::ApiError(e)),
        }

        info!("Started container: {}", id);
        Ok(())
    }

    async fn kill_container(&self, id: &str) -> Result<()> {
        debug!("Killing container: {}", id);
        self.docker
            .kill_container(id, None::<bollard::container::KillContainerOptions<String>>)
            .await?;
        info!("Killed container: {}", id);
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        debug!("Removing container: {}", id);
        self.docker
            .remove_container(
                id,
                Some(bollard::container::RemoveContainerOptions {
                    force: false,
                    ..Default::default()
                }),
            )
            .await?;
        info!("Removed container: {}", id);
        Ok(())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerInspectResponse> {
        self.docker
            .inspect_container(id, None::<bollard::query_parameters::InspectContainerOptions>)
            .await
            .map_err(|e| match e {
                bollard::errors::Error::DockerResponseServerError {
                    status_code: 404, ..
                } => ContainerError::NotFound(id.to_string()),
                e => ContainerError::ApiError(e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires Docker/Podman to be running
    async fn test_client_connection() {
        let client = ContainerClient::new().await.unwrap();
        client.ping().await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn test_list_includes_stopped_containers() {
        let client = ContainerClient::new().await.unwrap();
        let containers = client.list_containers().await.unwrap();
        println!("Found {} containers", containers.len());
    }

    #[tokio::test]
    #[ignore]
    async fn test_inspect_missing_container() {
        let client = ContainerClient::new().await.unwrap();
        let result = client.inspect_container("docker-db-does-not-exist").await;
        assert!(matches!(result, Err(ContainerError::NotFound(_))));
    }
}
