//! CLI-specific functionality for docker-db
//!
//! Argument parsing and config file discovery. Both produce
//! [`RawOptions`](crate::settings::RawOptions) that the settings resolver merges.

pub mod args;
pub mod config;

pub use args::{Args, DbArgs};
pub use config::ConfigDiscovery;
