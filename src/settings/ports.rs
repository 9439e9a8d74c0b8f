//! Port handling: container port parsing and host port allocation.

use super::SettingsError;
use std::fmt;
use std::net::{Ipv4Addr, TcpListener};
use tracing::debug;

/// Port the database listens on inside the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerPort {
    /// Port number
    pub port: u16,
    /// Transport protocol (`tcp` unless written as `5432/udp`)
    pub protocol: String,
}

impl ContainerPort {
    /// Parse `5432`, `5432/tcp` or `5432/udp`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidPort`] if the port number or protocol is invalid.
    pub fn parse(key: &'static str, value: &str) -> Result<Self, SettingsError> {
        let invalid = || SettingsError::InvalidPort {
            key,
            value: value.to_string(),
        };

        let (port, protocol) = match value.trim().split_once('/') {
            Some((port, protocol)) => (port, protocol.to_ascii_lowercase()),
            None => (value.trim(), "tcp".to_string()),
        };

        if !matches!(protocol.as_str(), "tcp" | "udp" | "sctp") {
            return Err(invalid());
        }

        Ok(Self {
            port: parse_port_number(key, port).map_err(|_| invalid())?,
            protocol,
        })
    }
}

impl fmt::Display for ContainerPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.port, self.protocol)
    }
}

/// Parse a host-side port number.
///
/// # Errors
///
/// Returns [`SettingsError::InvalidPort`] for anything outside `1..=65535`.
pub fn parse_port_number(key: &'static str, value: &str) -> Result<u16, SettingsError> {
    match value.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(SettingsError::InvalidPort {
            key,
            value: value.to_string(),
        }),
    }
}

/// Ask the OS for a free port by binding an ephemeral socket and releasing it.
///
/// The port is not reserved: another process may grab it before the
/// container starts.
///
/// # Errors
///
/// Returns [`SettingsError::PortAllocation`] if the bind fails.
pub fn find_unused_port() -> Result<u16, SettingsError> {
    let listener =
        TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0)).map_err(SettingsError::PortAllocation)?;
    let port = listener
        .local_addr()
        .map_err(SettingsError::PortAllocation)?
        .port();
    drop(listener);

    debug!("Allocated ephemeral host port {}", port);
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_port_defaults_to_tcp() {
        let port = ContainerPort::parse("db-port", "5432").unwrap();
        assert_eq!(port.port, 5432);
        assert_eq!(port.protocol, "tcp");
        assert_eq!(port.to_string(), "5432/tcp");
    }

    #[test]
    fn test_container_port_with_protocol() {
        let port = ContainerPort::parse("db-port", "53/UDP").unwrap();
        assert_eq!(port.to_string(), "53/udp");
    }

    #[test]
    fn test_invalid_ports() {
        assert!(ContainerPort::parse("db-port", "postgres").is_err());
        assert!(ContainerPort::parse("db-port", "5432/http").is_err());
        assert!(parse_port_number("db-host-port", "0").is_err());
        assert!(parse_port_number("db-host-port", "70000").is_err());
    }

    #[test]
    fn test_unused_port_is_bindable() {
        let port = find_unused_port().unwrap();
        assert_ne!(port, 0);
        assert!(TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).is_ok());
    }
}
