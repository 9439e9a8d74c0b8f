//! Image acquisition: registry pulls and Dockerfile builds.

use crate::container::{ContainerError, Result};
use crate::settings::BuildSpec;
use bollard::Docker;
use futures::stream::StreamExt;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info};

/// Engine command line tools, in lookup order.
const RUNTIME_CLIS: [&str; 2] = ["docker", "podman"];

/// Pulls and builds database images.
pub struct ImageBuilder {
    docker: Docker,
}

impl ImageBuilder {
    /// Create a new image builder.
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// Build an image from a Dockerfile using the engine CLI.
    ///
    /// Intermediate containers are removed (`--rm`); the base image is not re-pulled.
    ///
    /// # Errors
    ///
    /// Returns error if no engine CLI is available or the build fails.
    pub async fn build(&self, spec: &BuildSpec) -> Result<String> {
        let cli = runtime_cli()?;
        let dockerfile = spec.dockerfile_path();
        info!(
            "Building image {} from {} using {}",
            spec.tag,
            dockerfile.display(),
            cli.display()
        );

        let output = Command::new(&cli)
            .arg("build")
            .arg("--rm")
            .arg("-t")
            .arg(&spec.tag)
            .arg("-f")
            .arg(&dockerfile)
            .arg(&spec.context)
            .output()
            .await
            .map_err(|e| {
                ContainerError::CommandFailed(format!("Failed to run {} build: {}", cli.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ContainerError::CommandFailed(format!(
                "Image build failed: {}",
                stderr.trim()
            )));
        }

        info!("Successfully built image: {}", spec.tag);
        Ok(spec.tag.clone())
    }

    /// Pull an image from a registry.
    ///
    /// # Errors
    ///
    /// Returns error if image pull fails.
    pub async fn pull(&self, image: &str) -> Result<()> {
        info!("Pulling image: {}", image);

        let mut stream = self.docker.create_image(
            Some(bollard::image::CreateImageOptions {
                from_image: image,
                ..Default::default()
            }),
            None,
            None,
        );

        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(status) = info.status {
                        debug!("Pull: {}", status);
                    }
                    if let Some(error) = info.error {
                        return Err(ContainerError::Other(format!("Pull failed: {}", error)));
                    }
                }
                Err(e) => {
                    return Err(ContainerError::ApiError(e));
                }
            }
        }

        info!("Successfully pulled image: {}", image);
        Ok(())
    }
}

/// Locate the docker (or podman) binary on `PATH`.
fn runtime_cli() -> Result<PathBuf> {
    RUNTIME_CLIS
        .iter()
        .find_map(|name| which::which(name).ok())
        .ok_or_else(|| {
            ContainerError::CommandFailed(
                "Neither docker nor podman was found on PATH".to_string(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires Docker
    async fn test_pull_unknown_image_fails() {
        let docker = Docker::connect_with_local_defaults().unwrap();
        let builder = ImageBuilder::new(docker);

        let result = builder.pull("not-an-image-docker-db:latest").await;
        assert!(result.is_err());
    }
}
