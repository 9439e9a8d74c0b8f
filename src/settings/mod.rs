//! Settings resolution.
//!
//! Merges the two configuration sources (command line flags and the config
//! file) into one immutable [`Settings`] value. Flags win over the file for
//! every key; defaults (container name, host port, build context) are derived
//! once, at construction, so every later read sees the same value.
//!
//! ```rust
//! use docker_db::settings::{RawOptions, resolve};
//!
//! let flags = RawOptions {
//!     db_image: Some("postgres:latest".to_string()),
//!     db_port: Some("5432".to_string()),
//!     ..Default::default()
//! };
//! let ini = RawOptions {
//!     db_image: Some("postgres:15".to_string()),
//!     db_host_port: Some("5433".to_string()),
//!     ..Default::default()
//! };
//!
//! let settings = resolve(&flags, &ini).unwrap();
//! assert_eq!(settings.image(), Some("postgres:latest"));
//! assert_eq!(settings.host_port(), 5433);
//! ```

pub mod ports;
pub mod volume;

pub use ports::{ContainerPort, find_unused_port};
pub use volume::{DEFAULT_PERMISSIONS, VolumeMount, parse_volume_args};

use crate::env::{CONTAINER_NAME_PREFIX, keys};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

/// Configuration errors. All of them are fatal before any engine call.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Neither an image nor a Dockerfile was configured
    #[error("Must specify an image or a Dockerfile to use as the database.")]
    MissingImageSource,

    /// No in-container port configured
    #[error("Must specify the port the database listens on inside the container ({}).", keys::PORT)]
    MissingContainerPort,

    /// Port value could not be parsed
    #[error("Invalid port for {key}: '{value}'")]
    InvalidPort { key: &'static str, value: String },

    /// Volume mount entry could not be parsed
    #[error("Invalid {key} entry '{spec}': {reason}", key = keys::VOLUME_ARGS)]
    InvalidVolumeSpec { spec: String, reason: String },

    /// Environment entry without `=`
    #[error("Invalid {key} entry '{0}': expected KEY=VALUE", key = keys::DOCKER_ENV_VARS)]
    InvalidEnvVar(String),

    /// Unknown reuse policy
    #[error("Invalid {key} '{0}': expected 'exact' or 'prefix'", key = keys::NAME_MATCH)]
    InvalidNameMatch(String),

    /// Ephemeral port lookup failed
    #[error("Unable to find an unused host port: {0}")]
    PortAllocation(#[source] std::io::Error),

    /// Config file could not be read or parsed
    #[error("Unable to load config file {}: {reason}", path.display())]
    ConfigFile { path: PathBuf, reason: String },
}

/// Unresolved option values from a single source.
///
/// The field names double as the config file keys (`db-image`, `db-port`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawOptions {
    pub db_image: Option<String>,
    pub db_name: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub db_port: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub db_host_port: Option<String>,
    pub db_volume_args: Option<String>,
    pub db_persist_container: Option<bool>,
    pub db_dockerfile: Option<String>,
    pub db_docker_context: Option<String>,
    pub db_docker_env_vars: Option<String>,
    pub db_name_match: Option<String>,
}

impl RawOptions {
    /// Layer `self` over `lower`: every value set here wins, gaps are filled from `lower`.
    ///
    /// Empty strings count as unset. The persistence flag is an `Option<bool>`
    /// because a store-true flag can only ever say "yes"; an absent flag
    /// (`None`) therefore never overrides a `true` from the lower layer.
    pub fn layered_over(&self, lower: &RawOptions) -> RawOptions {
        fn pick(upper: &Option<String>, lower: &Option<String>) -> Option<String> {
            non_empty(upper).or_else(|| non_empty(lower))
        }

        RawOptions {
            db_image: pick(&self.db_image, &lower.db_image),
            db_name: pick(&self.db_name, &lower.db_name),
            db_port: pick(&self.db_port, &lower.db_port),
            db_host_port: pick(&self.db_host_port, &lower.db_host_port),
            db_volume_args: pick(&self.db_volume_args, &lower.db_volume_args),
            db_persist_container: self.db_persist_container.or(lower.db_persist_container),
            db_dockerfile: pick(&self.db_dockerfile, &lower.db_dockerfile),
            db_docker_context: pick(&self.db_docker_context, &lower.db_docker_context),
            db_docker_env_vars: pick(&self.db_docker_env_vars, &lower.db_docker_env_vars),
            db_name_match: pick(&self.db_name_match, &lower.db_name_match),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Number(i64),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.map(|value| match value {
            StringOrNumber::Text(text) => text,
            StringOrNumber::Number(number) => number.to_string(),
        }),
    )
}

/// How an existing container is recognised as reusable.
///
/// Engine names may collide: with [`NameMatch::Prefix`] a container called
/// `pg-test-old` is reused for the name `pg-test`. Use [`NameMatch::Exact`]
/// when several sessions share an engine with overlapping names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NameMatch {
    /// Container name must equal the configured name
    Exact,
    /// Container name must start with the configured name
    #[default]
    Prefix,
}

impl NameMatch {
    /// Check an engine-reported name (with or without the leading `/`) against `wanted`.
    pub fn matches(&self, candidate: &str, wanted: &str) -> bool {
        let candidate = candidate.strip_prefix('/').unwrap_or(candidate);
        match self {
            NameMatch::Exact => candidate == wanted,
            NameMatch::Prefix => candidate.starts_with(wanted),
        }
    }
}

impl FromStr for NameMatch {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(NameMatch::Exact),
            "prefix" => Ok(NameMatch::Prefix),
            _ => Err(SettingsError::InvalidNameMatch(s.to_string())),
        }
    }
}

impl fmt::Display for NameMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameMatch::Exact => write!(f, "exact"),
            NameMatch::Prefix => write!(f, "prefix"),
        }
    }
}

/// Dockerfile build request derived from settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    /// Dockerfile path, relative to the context unless absolute
    pub dockerfile: PathBuf,
    /// Build context directory
    pub context: PathBuf,
    /// Tag assigned to the built image
    pub tag: String,
}

impl BuildSpec {
    /// Full path of the Dockerfile as the engine will read it.
    pub fn dockerfile_path(&self) -> PathBuf {
        self.context.join(&self.dockerfile)
    }
}

/// Where the database image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Build from a Dockerfile
    Build(BuildSpec),
    /// Pull `name:tag` from a registry
    Pull(String),
}

/// Fully resolved, immutable session settings.
#[derive(Debug, Clone)]
pub struct Settings {
    image: Option<String>,
    source: ImageSource,
    name: String,
    container_port: ContainerPort,
    host_port: u16,
    host_port_configured: bool,
    volumes: Vec<VolumeMount>,
    env: Vec<(String, String)>,
    persist_container: bool,
    name_match: NameMatch,
}

impl Settings {
    /// Build settings from an already merged set of options.
    ///
    /// # Errors
    ///
    /// Fails validation before any engine interaction, see [`SettingsError`].
    pub fn from_raw(raw: &RawOptions) -> Result<Self, SettingsError> {
        let image = non_empty(&raw.db_image);
        let dockerfile = non_empty(&raw.db_dockerfile);

        if image.is_none() && dockerfile.is_none() {
            return Err(SettingsError::MissingImageSource);
        }

        let container_port = non_empty(&raw.db_port)
            .ok_or(SettingsError::MissingContainerPort)
            .and_then(|port| ContainerPort::parse(keys::PORT, &port))?;

        let name = match non_empty(&raw.db_name) {
            Some(name) => name,
            None => {
                let generated = format!("{}{}", CONTAINER_NAME_PREFIX, uuid::Uuid::new_v4());
                debug!("No container name configured, using {}", generated);
                generated
            }
        };

        let host_port_configured = non_empty(&raw.db_host_port).is_some();
        let host_port = match non_empty(&raw.db_host_port) {
            Some(port) => ports::parse_port_number(keys::HOST_PORT, &port)?,
            None => find_unused_port()?,
        };

        let source = match (dockerfile, &image) {
            (Some(dockerfile), _) => ImageSource::Build(BuildSpec {
                dockerfile: PathBuf::from(dockerfile),
                context: non_empty(&raw.db_docker_context).map(PathBuf::from).unwrap_or_else(
                    || std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
                ),
                tag: name.clone(),
            }),
            (None, Some(image)) => ImageSource::Pull(image.clone()),
            (None, None) => return Err(SettingsError::MissingImageSource),
        };

        let name_match = match non_empty(&raw.db_name_match) {
            Some(policy) => policy.parse()?,
            None => NameMatch::default(),
        };

        Ok(Self {
            image,
            source,
            name,
            container_port,
            host_port,
            host_port_configured,
            volumes: parse_volume_args(raw.db_volume_args.as_deref())?,
            env: parse_env_vars(raw.db_docker_env_vars.as_deref())?,
            persist_container: raw.db_persist_container.unwrap_or(false),
            name_match,
        })
    }

    /// Configured source image, if any.
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    /// Dockerfile build request, if any.
    pub fn build_spec(&self) -> Option<&BuildSpec> {
        match &self.source {
            ImageSource::Build(build) => Some(build),
            ImageSource::Pull(_) => None,
        }
    }

    /// Where the image comes from. A build takes precedence over a pull.
    pub fn image_source(&self) -> &ImageSource {
        &self.source
    }

    /// Container name; generated once if not configured.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn container_port(&self) -> &ContainerPort {
        &self.container_port
    }

    pub fn host_port(&self) -> u16 {
        self.host_port
    }

    /// Whether the host port came from a source rather than the free-port lookup.
    pub fn host_port_is_configured(&self) -> bool {
        self.host_port_configured
    }

    pub fn volumes(&self) -> &[VolumeMount] {
        &self.volumes
    }

    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn persist_container(&self) -> bool {
        self.persist_container
    }

    pub fn name_match(&self) -> NameMatch {
        self.name_match
    }
}

/// Resolve settings from command line flags and config file values.
///
/// For every key the flag value wins; a value present in only one source is
/// used as is.
///
/// # Errors
///
/// See [`Settings::from_raw`].
pub fn resolve(flags: &RawOptions, ini: &RawOptions) -> Result<Settings, SettingsError> {
    Settings::from_raw(&flags.layered_over(ini))
}

/// Parse comma separated `KEY=VALUE` pairs. Surrounding quotes on the value are stripped.
///
/// # Errors
///
/// Returns [`SettingsError::InvalidEnvVar`] for entries without `=` or with an empty key.
pub fn parse_env_vars(raw: Option<&str>) -> Result<Vec<(String, String)>, SettingsError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), unquote(value.trim()).to_string()))
            }
            _ => Err(SettingsError::InvalidEnvVar(entry.to_string())),
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
