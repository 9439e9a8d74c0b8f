//! Configuration discovery and loading
//!
//! The persistent options live in a TOML file under a `[docker-db]` table,
//! keyed like the command line flags:
//!
//! ```toml
//! [docker-db]
//! db-image = "postgres:latest"
//! db-port = 5432
//! db-volume-args = "pg-data:/var/lib/postgresql/data:rw"
//! ```
//!
//! Discovery hierarchy (first existing file wins):
//! 1. Explicit `--config <FILE>`
//! 2. Current directory: ./docker-db.toml or ./.docker-db/config.toml
//! 3. User config: ~/.docker-db/config.toml
//! 4. No file: every option unset

use crate::env;
use crate::settings::{RawOptions, SettingsError};
use serde::Deserialize;
use std::env as std_env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(rename = "docker-db", default)]
    options: RawOptions,
}

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Load the config file values, or empty options if there is no file.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::ConfigFile`] if an explicit file is missing or
    /// any file fails to parse.
    pub fn load(explicit: Option<&Path>) -> Result<RawOptions, SettingsError> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(SettingsError::ConfigFile {
                    path: path.to_path_buf(),
                    reason: "file not found".to_string(),
                });
            }
            return Self::from_toml_file(path);
        }

        match Self::find_config_file() {
            Some(path) => Self::from_toml_file(&path),
            None => {
                info!("No configuration file found, using command line options only");
                Ok(RawOptions::default())
            }
        }
    }

    /// Parse the `[docker-db]` table of a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::ConfigFile`] on read or parse failure.
    pub fn from_toml_file(path: &Path) -> Result<RawOptions, SettingsError> {
        info!("Loading configuration from: {:?}", path);
        let config_error = |reason: String| SettingsError::ConfigFile {
            path: path.to_path_buf(),
            reason,
        };

        let content = fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        Self::from_toml_str(&content).map_err(config_error)
    }

    /// Parse the `[docker-db]` table of TOML text.
    pub fn from_toml_str(content: &str) -> Result<RawOptions, String> {
        toml::from_str::<ConfigFile>(content)
            .map(|file| file.options)
            .map_err(|e| e.to_string())
    }

    /// Find configuration file using discovery hierarchy
    pub fn find_config_file() -> Option<PathBuf> {
        for candidate in Self::get_config_candidates() {
            debug!("Checking for config file: {:?}", candidate);
            if candidate.is_file() {
                debug!("Found config file: {:?}", candidate);
                return Some(candidate);
            }
        }

        debug!("No config file found in discovery hierarchy");
        None
    }

    /// Get list of configuration file candidates in priority order
    fn get_config_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = std_env::current_dir() {
            candidates.push(env::root_config_file_path(&current_dir));
            candidates.push(env::local_config_file_path(&current_dir));
        }

        if let Some(home_dir) = Self::get_home_dir() {
            candidates.push(env::user_config_file_path(&home_dir));
        }

        candidates
    }

    /// Get home directory path
    fn get_home_dir() -> Option<PathBuf> {
        std_env::var("HOME")
            .ok()
            .or_else(|| std_env::var("USERPROFILE").ok())
            .map(PathBuf::from)
    }

    /// Show configuration discovery information for debugging
    pub fn show_discovery_info(explicit: Option<&Path>) {
        println!("Configuration Discovery Hierarchy:");
        println!();

        if let Some(path) = explicit {
            println!("  --config {:?}", path);
        }

        for (i, candidate) in Self::get_config_candidates().iter().enumerate() {
            let status = if candidate.exists() {
                if candidate.is_file() {
                    "✓ EXISTS"
                } else {
                    "✗ NOT A FILE"
                }
            } else {
                "✗ NOT FOUND"
            };

            println!("  {}. {:?} - {}", i + 1, candidate, status);
        }

        println!();
        match explicit
            .map(Path::to_path_buf)
            .or_else(Self::find_config_file)
        {
            Some(found) => println!("Active configuration: {:?}", found),
            None => println!("Active configuration: command line only"),
        }
    }
}
