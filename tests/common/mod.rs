//! In-memory container engine that records every call.

#![allow(dead_code)]

use async_trait::async_trait;
use bollard::models::{ContainerInspectResponse, HostConfig, PortBinding};
use docker_db::container::{ContainerConfig, ContainerEngine, ContainerSummary};
use docker_db::settings::BuildSpec;
use docker_db::{ContainerError, RawOptions, Settings, resolve};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Steps that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fail {
    List,
    Pull,
    Build,
    CreateVolume,
    Create,
    Start,
    Kill,
    Remove,
    Inspect,
}

#[derive(Default)]
struct State {
    containers: Vec<ContainerSummary>,
    volumes: HashSet<String>,
    images: HashSet<String>,
    calls: Vec<String>,
    created: Vec<(String, ContainerConfig)>,
    host_configs: HashMap<String, HostConfig>,
    failures: HashSet<Fail>,
    next_id: u32,
}

#[derive(Clone, Default)]
pub struct RecordingEngine {
    state: Arc<Mutex<State>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(self, step: Fail) -> Self {
        self.state.lock().unwrap().failures.insert(step);
        self
    }

    pub fn with_container(self, id: &str, name: &str, image: &str) -> Self {
        self.state.lock().unwrap().containers.push(ContainerSummary {
            id: id.to_string(),
            names: vec![format!("/{}", name)],
            image: image.to_string(),
        });
        self
    }

    /// Existing container publishing `container_port` (e.g. `5432/tcp`) on `host_port`.
    pub fn with_published_container(
        self,
        id: &str,
        name: &str,
        image: &str,
        container_port: &str,
        host_port: u16,
    ) -> Self {
        let host_config = HostConfig {
            port_bindings: Some(HashMap::from([(
                container_port.to_string(),
                Some(vec![PortBinding {
                    host_ip: Some("0.0.0.0".to_string()),
                    host_port: Some(host_port.to_string()),
                }]),
            )])),
            ..Default::default()
        };
        self.state
            .lock()
            .unwrap()
            .host_configs
            .insert(id.to_string(), host_config);
        self.with_container(id, name, image)
    }

    pub fn with_volume(self, name: &str) -> Self {
        self.state.lock().unwrap().volumes.insert(name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_names(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|c| c.split(' ').next().unwrap_or_default().to_string())
            .collect()
    }

    pub fn created(&self) -> Vec<(String, ContainerConfig)> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn container_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .containers
            .iter()
            .flat_map(|c| c.names.clone())
            .collect()
    }

    pub fn has_volume(&self, name: &str) -> bool {
        self.state.lock().unwrap().volumes.contains(name)
    }

    fn record(&self, call: String, step: Option<Fail>) -> Result<(), ContainerError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call.clone());
        match step {
            Some(step) if state.failures.contains(&step) => {
                Err(ContainerError::Other(format!("injected failure: {}", call)))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ContainerEngine for RecordingEngine {
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, ContainerError> {
        self.record("list".to_string(), Some(Fail::List))?;
        Ok(self.state.lock().unwrap().containers.clone())
    }

    async fn pull_image(&self, image: &str) -> Result<(), ContainerError> {
        self.record(format!("pull {}", image), Some(Fail::Pull))?;
        self.state.lock().unwrap().images.insert(image.to_string());
        Ok(())
    }

    async fn build_image(&self, spec: &BuildSpec) -> Result<(), ContainerError> {
        self.record(
            format!("build {} {}", spec.tag, spec.dockerfile_path().display()),
            Some(Fail::Build),
        )?;
        self.state.lock().unwrap().images.insert(spec.tag.clone());
        Ok(())
    }

    async fn volume_exists(&self, name: &str) -> Result<bool, ContainerError> {
        self.record(format!("volume_exists {}", name), None)?;
        Ok(self.state.lock().unwrap().volumes.contains(name))
    }

    async fn create_volume(&self, name: &str) -> Result<(), ContainerError> {
        self.record(format!("create_volume {}", name), Some(Fail::CreateVolume))?;
        self.state.lock().unwrap().volumes.insert(name.to_string());
        Ok(())
    }

    async fn create_container(
        &self,
        name: &str,
        config: &ContainerConfig,
    ) -> Result<String, ContainerError> {
        self.record(format!("create {}", name), Some(Fail::Create))?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("{:064x}", state.next_id);
        state.containers.push(ContainerSummary {
            id: id.clone(),
            names: vec![format!("/{}", name)],
            image: config.image.clone(),
        });
        state.host_configs.insert(id.clone(), config.host_config.clone());
        state.created.push((name.to_string(), config.clone()));
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<(), ContainerError> {
        self.record(format!("start {}", id), Some(Fail::Start))
    }

    async fn kill_container(&self, id: &str) -> Result<(), ContainerError> {
        self.record(format!("kill {}", id), Some(Fail::Kill))
    }

    async fn remove_container(&self, id: &str) -> Result<(), ContainerError> {
        self.record(format!("remove {}", id), Some(Fail::Remove))?;
        self.state.lock().unwrap().containers.retain(|c| c.id != id);
        Ok(())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerInspectResponse, ContainerError> {
        self.record(format!("inspect {}", id), Some(Fail::Inspect))?;
        let state = self.state.lock().unwrap();
        let container = state
            .containers
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        Ok(ContainerInspectResponse {
            id: Some(container.id.clone()),
            name: container.names.first().cloned(),
            host_config: state.host_configs.get(id).cloned(),
            ..Default::default()
        })
    }
}

/// Settings for a pulled postgres image on fixed ports.
pub fn postgres_settings(name: &str, extra: RawOptions) -> Settings {
    let flags = RawOptions {
        db_image: Some("postgres:latest".to_string()),
        db_name: Some(name.to_string()),
        db_port: Some("5432".to_string()),
        db_host_port: Some("5434".to_string()),
        ..Default::default()
    };
    resolve(&extra, &flags).unwrap()
}
