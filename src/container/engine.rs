//! Container engine capability.
//!
//! Every engine call the orchestrator makes is a blocking (awaited) operation
//! on this trait. [`ContainerClient`](super::ContainerClient) implements it
//! against Docker/Podman; tests substitute an in-memory engine.

use super::{ContainerConfig, Result};
use crate::settings::BuildSpec;
use async_trait::async_trait;
use bollard::models::ContainerInspectResponse;

/// Container listing entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSummary {
    /// Container ID
    pub id: String,
    /// Container names, as reported by the engine (usually with a leading `/`)
    pub names: Vec<String>,
    /// Image name
    pub image: String,
}

/// Operations the lifecycle orchestrator needs from a container engine.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// List all containers, including stopped ones.
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>>;

    /// Pull `image` (`name:tag`) from its registry.
    async fn pull_image(&self, image: &str) -> Result<()>;

    /// Build an image from a Dockerfile, tagging it with `spec.tag`.
    async fn build_image(&self, spec: &BuildSpec) -> Result<()>;

    /// Whether a named volume exists.
    async fn volume_exists(&self, name: &str) -> Result<bool>;

    /// Create a named volume.
    async fn create_volume(&self, name: &str) -> Result<()>;

    /// Create a container and return its ID.
    async fn create_container(&self, name: &str, config: &ContainerConfig) -> Result<String>;

    /// Start a container. Starting a running container is not an error.
    async fn start_container(&self, id: &str) -> Result<()>;

    /// Kill a running container.
    async fn kill_container(&self, id: &str) -> Result<()>;

    /// Remove a container.
    async fn remove_container(&self, id: &str) -> Result<()>;

    /// Low-level inspection (port bindings, mounts, image).
    async fn inspect_container(&self, id: &str) -> Result<ContainerInspectResponse>;
}
