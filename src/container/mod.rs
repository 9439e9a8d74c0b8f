//! Database container lifecycle.
//!
//! This module turns resolved [`Settings`](crate::settings::Settings) into a
//! running database container and tears it down again when the session ends.
//! All engine interaction goes through the [`ContainerEngine`] capability so
//! the orchestration logic can run against a test double.
//!
//! ## Architecture
//!
//! - `engine`: the `ContainerEngine` capability trait
//! - `client`: Docker/Podman implementation of the trait via bollard
//! - `config`: container configuration builder (image, ports, binds, env)
//! - `image`: image pulls and Dockerfile builds
//! - `volume`: named volume management
//! - `orchestrator`: discovery, image acquisition, create, start, teardown
//! - `lifecycle`: scoped sessions that always tear down
//!
//! ## Usage
//!
//! ```rust,no_run
//! use docker_db::container::{ContainerClient, DatabaseOrchestrator, with_database};
//! use docker_db::settings::{RawOptions, resolve};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let flags = RawOptions {
//!         db_image: Some("postgres:latest".to_string()),
//!         db_port: Some("5432".to_string()),
//!         db_docker_env_vars: Some("POSTGRES_PASSWORD=postgres".to_string()),
//!         ..Default::default()
//!     };
//!     let settings = resolve(&flags, &RawOptions::default())?;
//!
//!     let engine = Arc::new(ContainerClient::new().await?);
//!     let orchestrator = DatabaseOrchestrator::new(engine, settings);
//!
//!     with_database(&orchestrator, |db| async move {
//!         println!("database listening on localhost:{}", db.host_port);
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod engine;
mod image;
mod lifecycle;
mod orchestrator;
mod volume;

pub use client::ContainerClient;
pub use config::{ContainerConfig, ContainerConfigBuilder, published_host_port};
pub use engine::{ContainerEngine, ContainerSummary};
pub use image::ImageBuilder;
pub use lifecycle::{ContainerHandle, ContainerOrigin, TeardownReport, with_database};
pub use orchestrator::{AcquireError, DatabaseOrchestrator};
pub use volume::VolumeManager;

/// Container engine errors.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// Docker/Podman API error
    #[error("Container API error: {0}")]
    ApiError(#[from] bollard::errors::Error),

    /// Container not found
    #[error("Container not found: {0}")]
    NotFound(String),

    /// Container configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Engine command line invocation failed
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// Volume error
    #[error("Volume error: {0}")]
    VolumeError(String),

    /// General error
    #[error("Container error: {0}")]
    Other(String),
}

/// Result type for container operations.
pub type Result<T> = std::result::Result<T, ContainerError>;
