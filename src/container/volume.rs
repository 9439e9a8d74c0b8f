//! Named volume management.

use crate::container::{ContainerError, Result};
use bollard::Docker;
use std::collections::HashMap;
use tracing::{debug, info};

/// Volume driver used for volumes created on behalf of a session.
const DEFAULT_DRIVER: &str = "local";

/// Volume manager for named volumes.
pub struct VolumeManager {
    docker: Docker,
}

impl VolumeManager {
    /// Create a new volume manager.
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// Create a named volume with the local driver.
    ///
    /// # Errors
    ///
    /// Returns error if volume creation fails.
    pub async fn create_volume(&self, name: &str) -> Result<String> {
        debug!("Creating volume: {}", name);

        let response = self
            .docker
            .create_volume(bollard::volume::CreateVolumeOptions {
                name,
                driver: DEFAULT_DRIVER,
                driver_opts: HashMap::new(),
                labels: HashMap::from([(super::config::MANAGED_LABEL, "true")]),
            })
            .await
            .map_err(|e| ContainerError::VolumeError(format!("{}: {}", name, e)))?;

        info!("Created volume: {}", response.name);
        Ok(response.name)
    }

    /// Check if a volume exists.
    ///
    /// # Errors
    ///
    /// Returns error if volume inspection fails.
    pub async fn volume_exists(&self, name: &str) -> Result<bool> {
        match self.docker.inspect_volume(name).await {
            Ok(_) => Ok(true),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(ContainerError::ApiError(e)),
        }
    }
}
