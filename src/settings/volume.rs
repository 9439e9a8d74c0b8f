//! Volume argument mini-language.
//!
//! Mounts are written the way `docker run -v` takes them:
//! `hostPathOrVolumeName:containerPath[:permissions]`, several of them
//! separated by commas.

use super::SettingsError;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Permission mode used when a mount spec has no third field.
pub const DEFAULT_PERMISSIONS: &str = "rw";

/// Modes accepted in the third field: access mode and SELinux relabeling.
pub const PERMISSION_MODES: [&str; 4] = ["rw", "ro", "z", "Z"];

/// Same rule the engine applies: a source matching this is a named volume,
/// anything else (`/abs`, `./rel`, `~/x`) is a host path. Fields are split on
/// every `:`, so Windows drive letters are not supported.
static NAMED_VOLUME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]*$").expect("valid volume regex"));

/// A single parsed mount descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    /// Host filesystem path or named volume identifier
    pub source: String,
    /// Path inside the container
    pub target: String,
    /// Permission mode (`rw`, `ro`, ...)
    pub permissions: String,
}

impl VolumeMount {
    /// Parse one `source:target[:permissions]` entry.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidVolumeSpec`] when the entry does not
    /// have two or three fields, when source/target are empty or when the
    /// mode is not one of [`PERMISSION_MODES`].
    pub fn parse(spec: &str) -> Result<Self, SettingsError> {
        let invalid = |reason: &str| SettingsError::InvalidVolumeSpec {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let fields: Vec<&str> = spec.trim().split(':').collect();
        let (source, target, permissions) = match fields.as_slice() {
            [source, target] => (*source, *target, DEFAULT_PERMISSIONS),
            [source, target, perm] if perm.is_empty() => (*source, *target, DEFAULT_PERMISSIONS),
            [source, target, perm] => (*source, *target, *perm),
            [_] => return Err(invalid("expected source:target[:permissions]")),
            _ => return Err(invalid("too many ':' separated fields")),
        };

        if source.is_empty() {
            return Err(invalid("empty source"));
        }
        if target.is_empty() {
            return Err(invalid("empty container path"));
        }
        if !PERMISSION_MODES.contains(&permissions) {
            return Err(invalid("permissions must be one of rw, ro, z, Z"));
        }

        Ok(Self {
            source: source.to_string(),
            target: target.to_string(),
            permissions: permissions.to_string(),
        })
    }

    /// Whether the source names an engine-managed volume rather than a host path.
    pub fn is_named_volume(&self) -> bool {
        NAMED_VOLUME.is_match(&self.source)
    }

    /// Render the bind specification handed to the engine.
    pub fn bind_spec(&self) -> String {
        format!("{}:{}:{}", self.source, self.target, self.permissions)
    }
}

impl FromStr for VolumeMount {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VolumeMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.bind_spec())
    }
}

/// Parse the raw comma separated volume argument.
///
/// An absent value and an empty value both yield no mounts. Empty entries
/// between commas are skipped; order is preserved.
///
/// # Errors
///
/// Returns the first [`SettingsError::InvalidVolumeSpec`] encountered.
pub fn parse_volume_args(raw: Option<&str>) -> Result<Vec<VolumeMount>, SettingsError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(VolumeMount::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults_permissions() {
        let mounts = parse_volume_args(Some("/a:/b")).unwrap();
        assert_eq!(
            mounts,
            vec![VolumeMount {
                source: "/a".to_string(),
                target: "/b".to_string(),
                permissions: "rw".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_explicit_permissions() {
        let mounts = parse_volume_args(Some("/a:/b:ro")).unwrap();
        assert_eq!(mounts[0].permissions, "ro");
    }

    #[test]
    fn test_parse_multiple_in_order() {
        let mounts = parse_volume_args(Some("/a:/b,vol:/c:rw")).unwrap();
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[0].source, "/a");
        assert_eq!(mounts[1].source, "vol");
        assert_eq!(mounts[1].target, "/c");
    }

    #[test]
    fn test_absent_and_empty_yield_no_mounts() {
        assert!(parse_volume_args(None).unwrap().is_empty());
        assert!(parse_volume_args(Some("")).unwrap().is_empty());
        assert!(parse_volume_args(Some(" , ")).unwrap().is_empty());
    }

    #[test]
    fn test_trailing_colon_defaults_permissions() {
        let mount = VolumeMount::parse("data:/var/lib/data:").unwrap();
        assert_eq!(mount.permissions, "rw");
    }

    #[test]
    fn test_invalid_specs() {
        assert!(matches!(
            VolumeMount::parse("/only-source"),
            Err(SettingsError::InvalidVolumeSpec { .. })
        ));
        assert!(VolumeMount::parse("/a:/b:ro:extra").is_err());
        assert!(VolumeMount::parse(":/b").is_err());
        assert!(VolumeMount::parse("/a:").is_err());
    }

    #[test]
    fn test_unknown_permissions_rejected() {
        let err = VolumeMount::parse("/a:/b:bogus").unwrap_err();
        assert!(err.to_string().contains("permissions must be one of"));
        assert!(err.to_string().contains("db-volume-args"));

        assert_eq!(VolumeMount::parse("/a:/b:ro").unwrap().permissions, "ro");
        assert_eq!(VolumeMount::parse("/a:/b:Z").unwrap().permissions, "Z");
    }

    #[test]
    fn test_drive_letter_is_not_a_mount() {
        assert!(VolumeMount::parse("C:\\data:/data").is_err());
    }

    #[test]
    fn test_named_volume_detection() {
        assert!(VolumeMount::parse("test-vol:/data").unwrap().is_named_volume());
        assert!(VolumeMount::parse("pg_data.v2:/data").unwrap().is_named_volume());
        assert!(!VolumeMount::parse("/tmp/docker:/data").unwrap().is_named_volume());
        assert!(!VolumeMount::parse("./data:/data").unwrap().is_named_volume());
        assert!(!VolumeMount::parse("~/data:/data").unwrap().is_named_volume());
    }

    #[test]
    fn test_bind_spec() {
        let mount = VolumeMount::parse("/tmp/docker:/var/lib/postgresql/data").unwrap();
        assert_eq!(mount.bind_spec(), "/tmp/docker:/var/lib/postgresql/data:rw");
        assert_eq!(mount.to_string(), mount.bind_spec());
    }
}
