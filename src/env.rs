//! Environment constants and path utilities for docker-db.
//!
//! Centralizes option key names, file names and the variables exported to
//! wrapped test commands. The `--db-*` flags and the settings error messages
//! are spelled from [`keys`].

use std::path::{Path, PathBuf};

/// Prefix used when a container name has to be synthesized.
pub const CONTAINER_NAME_PREFIX: &str = "docker-db-";

/// Local configuration directory name (hidden directory like .git, .vscode)
pub const DOCKER_DB_DIR_NAME: &str = ".docker-db";

/// Configuration file name inside [`DOCKER_DB_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file name at the project root
pub const ROOT_CONFIG_FILE_NAME: &str = "docker-db.toml";

/// Table inside the configuration file holding the options
pub const CONFIG_TABLE: &str = "docker-db";

/// Option keys, shared by the command line (`--<key>`) and the config file.
pub mod keys {
    pub const IMAGE: &str = "db-image";
    pub const NAME: &str = "db-name";
    pub const PORT: &str = "db-port";
    pub const HOST_PORT: &str = "db-host-port";
    pub const VOLUME_ARGS: &str = "db-volume-args";
    pub const PERSIST_CONTAINER: &str = "db-persist-container";
    pub const DOCKERFILE: &str = "db-dockerfile";
    pub const DOCKER_CONTEXT: &str = "db-docker-context";
    pub const DOCKER_ENV_VARS: &str = "db-docker-env-vars";
    pub const NAME_MATCH: &str = "db-name-match";

    /// Every key, in flag order.
    pub const ALL: [&str; 10] = [
        IMAGE,
        NAME,
        PORT,
        HOST_PORT,
        VOLUME_ARGS,
        PERSIST_CONTAINER,
        DOCKERFILE,
        DOCKER_CONTEXT,
        DOCKER_ENV_VARS,
        NAME_MATCH,
    ];
}

/// Variables exported to the command run inside a database session.
pub mod exported {
    pub const CONTAINER_ID: &str = "DOCKER_DB_CONTAINER_ID";
    pub const CONTAINER_NAME: &str = "DOCKER_DB_CONTAINER_NAME";
    pub const HOST_PORT: &str = "DOCKER_DB_HOST_PORT";
    pub const PORT: &str = "DOCKER_DB_PORT";
}

/// Build the local `.docker-db/config.toml` path from a project root
pub fn local_config_file_path(project_root: &Path) -> PathBuf {
    project_root.join(DOCKER_DB_DIR_NAME).join(CONFIG_FILE_NAME)
}

/// Build the `docker-db.toml` path from a project root
pub fn root_config_file_path(project_root: &Path) -> PathBuf {
    project_root.join(ROOT_CONFIG_FILE_NAME)
}

/// Build the user-level `~/.docker-db/config.toml` path
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    home_dir.join(DOCKER_DB_DIR_NAME).join(CONFIG_FILE_NAME)
}
