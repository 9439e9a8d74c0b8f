//! Command line argument parsing
//!
//! Every database option is accepted as `--db-*`, with the same key as in the
//! config file. Anything after `--` is the command to run while the database
//! container is up.

use crate::env::keys;
use crate::settings::RawOptions;
use clap::{Args as ClapArgs, Parser};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "docker-db")]
#[command(author = "docker-db contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Provision a disposable database container for a test session and tear it down afterwards"
)]
#[command(long_about = None)]
pub struct Args {
    #[command(flatten)]
    pub db: DbArgs,

    /// Configuration file path (default: discovered, see --show-config)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Show configuration discovery information and exit
    #[arg(long = "show-config")]
    pub show_config: bool,

    /// Command to run while the database is up (after `--`)
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

/// Database options. Flags win over the config file.
#[derive(Debug, Clone, Default, ClapArgs)]
pub struct DbArgs {
    /// Image to use as the database, in the form "image_name:tag"
    #[arg(long = keys::IMAGE)]
    pub image: Option<String>,

    /// Container name; a random name prefixed with "docker-db-" is used if unset
    #[arg(long = keys::NAME)]
    pub name: Option<String>,

    /// Port the database listens on inside the container (5432 or 5432/tcp)
    #[arg(long = keys::PORT)]
    pub port: Option<String>,

    /// Port the database is published on on the host; a free port if unset
    #[arg(long = keys::HOST_PORT)]
    pub host_port: Option<String>,

    /// Volume mounts as for `docker run -v`, comma separated:
    /// /host/path:/path/in/container:rw or vol-name:/path/in/container:rw
    #[arg(long = keys::VOLUME_ARGS)]
    pub volume_args: Option<String>,

    /// Keep the container after the session instead of removing it
    #[arg(long = keys::PERSIST_CONTAINER)]
    pub persist_container: bool,

    /// Dockerfile to build the database image from; takes precedence over --db-image
    #[arg(long = keys::DOCKERFILE)]
    pub dockerfile: Option<String>,

    /// Build context directory (default: current directory)
    #[arg(long = keys::DOCKER_CONTEXT)]
    pub docker_context: Option<String>,

    /// Container environment as comma separated KEY=VALUE pairs
    #[arg(long = keys::DOCKER_ENV_VARS)]
    pub docker_env_vars: Option<String>,

    /// How an existing container is matched for reuse: "prefix" or "exact"
    #[arg(long = keys::NAME_MATCH)]
    pub name_match: Option<String>,
}

impl DbArgs {
    /// Flag values as a settings source.
    pub fn to_raw_options(&self) -> RawOptions {
        RawOptions {
            db_image: self.image.clone(),
            db_name: self.name.clone(),
            db_port: self.port.clone(),
            db_host_port: self.host_port.clone(),
            db_volume_args: self.volume_args.clone(),
            db_persist_container: self.persist_container.then_some(true),
            db_dockerfile: self.dockerfile.clone(),
            db_docker_context: self.docker_context.clone(),
            db_docker_env_vars: self.docker_env_vars.clone(),
            db_name_match: self.name_match.clone(),
        }
    }
}
