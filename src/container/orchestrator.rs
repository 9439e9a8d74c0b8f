//! Database container orchestration.
//!
//! Acquisition runs, in order: discovery of a reusable container, image
//! acquisition (build or pull), named volume pre-creation, container creation
//! and start. A reused container skips everything but the start and an
//! inspection of the host port it was published on. Every
//! acquisition failure is fatal and carries the failing operation, the
//! identifier involved and the engine's error.
//!
//! Release kills then removes the container. Both steps always run and their
//! failures are logged, never raised.

use crate::container::{
    ContainerConfig, ContainerEngine, ContainerError, ContainerHandle, ContainerOrigin,
    ContainerSummary, TeardownReport, published_host_port,
};
use crate::settings::{ImageSource, Settings};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fatal failures while bringing the database container up.
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    /// Listing existing containers failed
    #[error("Unable to list containers.\n{source}")]
    Discovery {
        #[source]
        source: ContainerError,
    },

    /// Dockerfile build failed
    #[error("Unable to build image at path: {}.\n{source}", path.display())]
    Build {
        path: PathBuf,
        #[source]
        source: ContainerError,
    },

    /// Registry pull failed
    #[error("Unable to pull image: {image}.\n{source}")]
    Pull {
        image: String,
        #[source]
        source: ContainerError,
    },

    /// Named volume lookup or creation failed
    #[error("Unable to create volume: {volume}.\n{source}")]
    Volume {
        volume: String,
        #[source]
        source: ContainerError,
    },

    /// Container creation failed
    #[error("Unable to create container {name} from image {image}.\n{source}")]
    Create {
        name: String,
        image: String,
        #[source]
        source: ContainerError,
    },

    /// Container start failed
    #[error("Unable to start container with ID: {id}.\n{source}")]
    Start {
        id: String,
        #[source]
        source: ContainerError,
    },

    /// Reused container could not be inspected for its published port
    #[error("Unable to inspect container with ID: {id}.\n{source}")]
    Inspect {
        id: String,
        #[source]
        source: ContainerError,
    },
}

/// Brings a database container up for a session and tears it down afterwards.
pub struct DatabaseOrchestrator {
    engine: Arc<dyn ContainerEngine>,
    settings: Settings,
}

impl DatabaseOrchestrator {
    /// Create an orchestrator for `settings` on `engine`.
    pub fn new(engine: Arc<dyn ContainerEngine>, settings: Settings) -> Self {
        Self { engine, settings }
    }

    /// Settings this orchestrator works from.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Engine this orchestrator talks to.
    pub fn engine(&self) -> &Arc<dyn ContainerEngine> {
        &self.engine
    }

    /// Find or create the database container and start it.
    ///
    /// # Errors
    ///
    /// Returns the first failing step as an [`AcquireError`]. There is no
    /// retry: a start failure caused by a busy host port surfaces as
    /// [`AcquireError::Start`].
    pub async fn acquire(&self) -> Result<ContainerHandle, AcquireError> {
        let settings = &self.settings;
        info!(
            "Acquiring database container '{}' (port {} -> host {})",
            settings.name(),
            settings.container_port(),
            settings.host_port()
        );

        let (id, image, origin) = match self.find_existing().await? {
            Some(existing) => {
                info!(
                    "Reusing existing container {} ({})",
                    existing.names.first().map(String::as_str).unwrap_or(""),
                    short_id(&existing.id)
                );
                (existing.id, existing.image, ContainerOrigin::Found)
            }
            None => {
                let (image, origin) = self.acquire_image().await?;
                self.ensure_named_volumes().await?;
                let id = self.create_container(&image).await?;
                (id, image, origin)
            }
        };

        self.engine
            .start_container(&id)
            .await
            .map_err(|source| AcquireError::Start {
                id: id.clone(),
                source,
            })?;

        let host_port = match origin {
            ContainerOrigin::Found => self.reused_host_port(&id).await?,
            ContainerOrigin::Built | ContainerOrigin::Pulled => settings.host_port(),
        };

        info!(
            "Database container '{}' started ({}, {:?}, host port {})",
            settings.name(),
            short_id(&id),
            origin,
            host_port
        );

        Ok(ContainerHandle {
            id,
            name: settings.name().to_string(),
            image,
            host_port,
            container_port: settings.container_port().clone(),
            origin,
        })
    }

    /// Tear the container down unless persistence was requested.
    ///
    /// Kill and remove are attempted independently; failures are logged and
    /// captured in the returned report.
    pub async fn release(&self, handle: &ContainerHandle) -> TeardownReport {
        if self.settings.persist_container() {
            info!(
                "Persisting container '{}' ({})",
                handle.name,
                short_id(&handle.id)
            );
            return TeardownReport::Persisted;
        }

        let kill = self.engine.kill_container(&handle.id).await;
        if let Err(e) = &kill {
            warn!("Unable to kill container with ID: {}: {}", handle.id, e);
        }

        let remove = self.engine.remove_container(&handle.id).await;
        if let Err(e) = &remove {
            warn!("Unable to remove container with ID: {}: {}", handle.id, e);
        }

        if kill.is_ok() && remove.is_ok() {
            info!("Removed container '{}' ({})", handle.name, short_id(&handle.id));
        }

        TeardownReport::Removed { kill, remove }
    }

    /// First container whose name matches the configured name under the reuse policy.
    async fn find_existing(&self) -> Result<Option<ContainerSummary>, AcquireError> {
        let wanted = self.settings.name();
        let policy = self.settings.name_match();

        let containers = self
            .engine
            .list_containers()
            .await
            .map_err(|source| AcquireError::Discovery { source })?;
        debug!("Engine reports {} containers", containers.len());

        Ok(containers.into_iter().find(|c| {
            c.names
                .iter()
                .any(|candidate| policy.matches(candidate, wanted))
        }))
    }

    /// Host port a reused container was published on when it was created.
    async fn reused_host_port(&self, id: &str) -> Result<u16, AcquireError> {
        let settings = &self.settings;
        let inspect = self
            .engine
            .inspect_container(id)
            .await
            .map_err(|source| AcquireError::Inspect {
                id: id.to_string(),
                source,
            })?;

        match published_host_port(&inspect, settings.container_port()) {
            Some(port) => {
                if settings.host_port_is_configured() && port != settings.host_port() {
                    warn!(
                        "Reused container {} publishes {} on host port {}, not the configured {}",
                        short_id(id),
                        settings.container_port(),
                        port,
                        settings.host_port()
                    );
                }
                Ok(port)
            }
            None => {
                warn!(
                    "Reused container {} does not publish {}, assuming host port {}",
                    short_id(id),
                    settings.container_port(),
                    settings.host_port()
                );
                Ok(settings.host_port())
            }
        }
    }

    /// Build or pull the image; returns the image reference to create from.
    async fn acquire_image(&self) -> Result<(String, ContainerOrigin), AcquireError> {
        match self.settings.image_source() {
            ImageSource::Build(spec) => {
                self.engine
                    .build_image(spec)
                    .await
                    .map_err(|source| AcquireError::Build {
                        path: spec.dockerfile_path(),
                        source,
                    })?;
                Ok((spec.tag.clone(), ContainerOrigin::Built))
            }
            ImageSource::Pull(image) => {
                self.engine
                    .pull_image(image)
                    .await
                    .map_err(|source| AcquireError::Pull {
                        image: image.clone(),
                        source,
                    })?;
                Ok((image.clone(), ContainerOrigin::Pulled))
            }
        }
    }

    /// Create every named volume that does not exist yet.
    ///
    /// A missing named volume would otherwise be created implicitly by the
    /// engine with default options, so a failure here aborts the session.
    async fn ensure_named_volumes(&self) -> Result<(), AcquireError> {
        for mount in self.settings.volumes() {
            if !mount.is_named_volume() {
                debug!("{} is a host path, no volume to create", mount.source);
                continue;
            }

            let volume_error = |source| AcquireError::Volume {
                volume: mount.source.clone(),
                source,
            };

            if self
                .engine
                .volume_exists(&mount.source)
                .await
                .map_err(volume_error)?
            {
                debug!("Volume {} already exists", mount.source);
                continue;
            }

            self.engine
                .create_volume(&mount.source)
                .await
                .map_err(volume_error)?;
        }
        Ok(())
    }

    async fn create_container(&self, image: &str) -> Result<String, AcquireError> {
        let name = self.settings.name();
        let create_error = |source| AcquireError::Create {
            name: name.to_string(),
            image: image.to_string(),
            source,
        };

        let config = ContainerConfig::for_database(&self.settings, image).map_err(create_error)?;
        self.engine
            .create_container(name, &config)
            .await
            .map_err(create_error)
    }
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}
