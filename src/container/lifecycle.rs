//! Session-scoped container lifecycle.
//!
//! [`with_database`] binds a database container to the lifetime of a piece
//! of async work: the container is acquired before the work starts and torn
//! down after it finishes, whether it returns, errors or panics.

use super::{AcquireError, ContainerEngine, ContainerError, DatabaseOrchestrator, Result};
use crate::settings::ContainerPort;
use bollard::models::ContainerInspectResponse;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

/// How the container of a session came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerOrigin {
    /// An existing container was reused
    Found,
    /// Created from an image built from a Dockerfile
    Built,
    /// Created from a pulled image
    Pulled,
}

/// Live database container handed to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    /// Engine container ID
    pub id: String,
    /// Configured container name
    pub name: String,
    /// Image the container runs
    pub image: String,
    /// Host port the database is published on
    pub host_port: u16,
    /// Port the database listens on inside the container
    pub container_port: ContainerPort,
    /// Whether the container was reused, built or pulled
    pub origin: ContainerOrigin,
}

impl ContainerHandle {
    /// Inspect the container through the engine (port bindings, mounts, image).
    ///
    /// # Errors
    ///
    /// Returns error if the engine inspection fails.
    pub async fn inspect(&self, engine: &dyn ContainerEngine) -> Result<ContainerInspectResponse> {
        engine.inspect_container(&self.id).await
    }
}

/// Outcome of the teardown step.
#[derive(Debug)]
pub enum TeardownReport {
    /// Persistence was requested; nothing was done
    Persisted,
    /// Kill and remove were attempted; each carries its own result
    Removed {
        kill: std::result::Result<(), ContainerError>,
        remove: std::result::Result<(), ContainerError>,
    },
}

impl TeardownReport {
    /// True when nothing failed.
    pub fn is_clean(&self) -> bool {
        match self {
            TeardownReport::Persisted => true,
            TeardownReport::Removed { kill, remove } => kill.is_ok() && remove.is_ok(),
        }
    }
}

/// Run `body` with a live database container.
///
/// Teardown (see [`DatabaseOrchestrator::release`]) runs on every exit path
/// of `body`. A panic inside `body` is resumed after teardown; teardown
/// failures are only logged so they never replace the body's outcome.
///
/// # Errors
///
/// Returns [`AcquireError`] if the container could not be brought up; `body`
/// is not run in that case.
pub async fn with_database<F, Fut, T>(
    orchestrator: &DatabaseOrchestrator,
    body: F,
) -> std::result::Result<T, AcquireError>
where
    F: FnOnce(ContainerHandle) -> Fut,
    Fut: Future<Output = T>,
{
    let handle = orchestrator.acquire().await?;

    // The call to `body` is inside the guard too: it may panic before returning its future.
    let session = handle.clone();
    let outcome = AssertUnwindSafe(async move { body(session).await })
        .catch_unwind()
        .await;
    if outcome.is_err() {
        warn!("Session panicked, tearing down container '{}'", handle.name);
    }

    let report = orchestrator.release(&handle).await;
    debug!("Teardown report for '{}': {:?}", handle.name, report);

    match outcome {
        Ok(value) => Ok(value),
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
