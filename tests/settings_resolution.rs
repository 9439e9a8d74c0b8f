//! Settings resolution across the flag and config file sources.

use clap::Parser;
use docker_db::cli::{Args, ConfigDiscovery};
use docker_db::settings::{ImageSource, NameMatch, VolumeMount};
use docker_db::{RawOptions, SettingsError, resolve};
use std::net::{Ipv4Addr, TcpListener};

fn full(prefix: &str) -> RawOptions {
    RawOptions {
        db_image: Some(format!("{}-image:latest", prefix)),
        db_name: Some(format!("{}-name", prefix)),
        db_port: Some("5432".to_string()),
        db_host_port: Some(if prefix == "flag" { "6001" } else { "6002" }.to_string()),
        db_volume_args: Some(format!("/{}:/data", prefix)),
        db_persist_container: None,
        db_dockerfile: None,
        db_docker_context: None,
        db_docker_env_vars: Some(format!("SOURCE={}", prefix)),
        db_name_match: Some(if prefix == "flag" { "exact" } else { "prefix" }.to_string()),
    }
}

#[test]
fn test_flag_values_win_for_every_key() {
    let settings = resolve(&full("flag"), &full("ini")).unwrap();

    assert_eq!(settings.image(), Some("flag-image:latest"));
    assert_eq!(settings.name(), "flag-name");
    assert_eq!(settings.host_port(), 6001);
    assert_eq!(settings.volumes()[0].source, "/flag");
    assert_eq!(
        settings.env(),
        &[("SOURCE".to_string(), "flag".to_string())]
    );
    assert_eq!(settings.name_match(), NameMatch::Exact);
}

#[test]
fn test_single_source_values_are_used() {
    let ini = full("ini");
    let settings = resolve(&RawOptions::default(), &ini).unwrap();
    assert_eq!(settings.image(), Some("ini-image:latest"));
    assert_eq!(settings.host_port(), 6002);

    let settings = resolve(&full("flag"), &RawOptions::default()).unwrap();
    assert_eq!(settings.name(), "flag-name");
}

#[test]
fn test_defaults_when_both_sources_are_silent() {
    let minimal = RawOptions {
        db_image: Some("postgres:latest".to_string()),
        db_port: Some("5432".to_string()),
        ..Default::default()
    };
    let settings = resolve(&minimal, &RawOptions::default()).unwrap();

    assert!(settings.name().starts_with("docker-db-"));
    assert!(settings.volumes().is_empty());
    assert!(settings.env().is_empty());
    assert!(!settings.persist_container());
    assert_eq!(settings.name_match(), NameMatch::Prefix);
    assert!(matches!(settings.image_source(), ImageSource::Pull(_)));

    let port = settings.host_port();
    assert_ne!(port, 0);
    assert!(TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).is_ok());
}

#[test]
fn test_generated_names_differ_between_sessions() {
    let minimal = RawOptions {
        db_image: Some("postgres:latest".to_string()),
        db_port: Some("5432".to_string()),
        ..Default::default()
    };
    let first = resolve(&minimal, &RawOptions::default()).unwrap();
    let second = resolve(&minimal, &RawOptions::default()).unwrap();
    assert_ne!(first.name(), second.name());
}

#[test]
fn test_no_image_fails_with_fixed_message() {
    let raw = RawOptions {
        db_name: Some("test-bad".to_string()),
        db_port: Some("1010".to_string()),
        db_host_port: Some("1011".to_string()),
        ..Default::default()
    };
    let err = resolve(&raw, &RawOptions::default()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Must specify an image or a Dockerfile to use as the database."
    );
}

#[test]
fn test_invalid_values_are_rejected() {
    let base = RawOptions {
        db_image: Some("postgres:latest".to_string()),
        db_port: Some("5432".to_string()),
        ..Default::default()
    };

    let bad_port = RawOptions {
        db_host_port: Some("not-a-port".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        resolve(&bad_port, &base),
        Err(SettingsError::InvalidPort { .. })
    ));

    let bad_volume = RawOptions {
        db_volume_args: Some("just-a-name".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        resolve(&bad_volume, &base),
        Err(SettingsError::InvalidVolumeSpec { .. })
    ));
}

#[test]
fn test_volume_order_is_preserved() {
    let raw = RawOptions {
        db_image: Some("postgres:latest".to_string()),
        db_port: Some("5432".to_string()),
        db_volume_args: Some("/a:/b,vol:/c:rw".to_string()),
        ..Default::default()
    };
    let settings = resolve(&raw, &RawOptions::default()).unwrap();
    assert_eq!(
        settings.volumes(),
        &[
            VolumeMount::parse("/a:/b:rw").unwrap(),
            VolumeMount::parse("vol:/c:rw").unwrap(),
        ]
    );
}

#[test]
fn test_command_line_over_config_file() {
    let ini = ConfigDiscovery::from_toml_str(
        r#"
[docker-db]
db-image = "postgres:15"
db-port = 5432
db-host-port = 5346
db-persist-container = true
"#,
    )
    .unwrap();
    let args = Args::try_parse_from(["docker-db", "--db-image=postgres:latest"]).unwrap();

    let settings = resolve(&args.db.to_raw_options(), &ini).unwrap();

    assert_eq!(settings.image(), Some("postgres:latest"));
    assert_eq!(settings.host_port(), 5346);
    assert!(settings.persist_container());
}
