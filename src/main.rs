use anyhow::Context;
use clap::Parser;
use docker_db::cli::{Args, ConfigDiscovery};
use docker_db::env::exported;
use docker_db::{ContainerClient, ContainerHandle, DatabaseOrchestrator, resolve, with_database};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "docker_db=debug"
    } else {
        "docker_db=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    if args.show_config {
        ConfigDiscovery::show_discovery_info(args.config.as_deref());
        return Ok(ExitCode::SUCCESS);
    }

    let ini = ConfigDiscovery::load(args.config.as_deref())?;
    let settings = resolve(&args.db.to_raw_options(), &ini)?;

    let engine = Arc::new(ContainerClient::new().await?);
    let orchestrator = DatabaseOrchestrator::new(engine, settings);

    let command = args.command;
    with_database(&orchestrator, |handle| async move {
        if command.is_empty() {
            hold_until_interrupted(&handle).await
        } else {
            run_command(&command, &handle).await
        }
    })
    .await?
}

/// Print the handle and keep the database up until Ctrl-C.
async fn hold_until_interrupted(handle: &ContainerHandle) -> anyhow::Result<ExitCode> {
    let summary = serde_json::json!({
        "id": handle.id,
        "name": handle.name,
        "image": handle.image,
        "host_port": handle.host_port,
        "container_port": handle.container_port.to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    info!("Database is up, press Ctrl-C to end the session");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    Ok(ExitCode::SUCCESS)
}

/// Run the session command with the container coordinates exported.
async fn run_command(command: &[String], handle: &ContainerHandle) -> anyhow::Result<ExitCode> {
    let (program, rest) = command
        .split_first()
        .context("No command given after --")?;

    let printable = command
        .iter()
        .map(|arg| shell_escape::escape(arg.into()))
        .collect::<Vec<_>>()
        .join(" ");
    info!("Running: {}", printable);

    let mut child = tokio::process::Command::new(program)
        .args(rest)
        .env(exported::CONTAINER_ID, &handle.id)
        .env(exported::CONTAINER_NAME, &handle.name)
        .env(exported::HOST_PORT, handle.host_port.to_string())
        .env(exported::PORT, handle.container_port.port.to_string())
        .spawn()
        .with_context(|| format!("Failed to run {}", printable))?;

    // Ctrl-C reaches the child too; keep waiting so teardown still runs.
    let status = loop {
        tokio::select! {
            status = child.wait() => break status.context("Failed to wait for command")?,
            _ = tokio::signal::ctrl_c() => info!("Interrupted, waiting for the command to exit"),
        }
    };

    info!("Command finished with {}", status);
    Ok(match status.code() {
        Some(0) => ExitCode::SUCCESS,
        Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        None => ExitCode::FAILURE,
    })
}
