//! Console client for the clan raid boss tracker.
//!
//! Connects to one group's clan battle endpoint, keeps the boss state in
//! sync through long-polling, and turns typed commands into actions.
//!
//! # Configuration
//!
//! A YAML file passed as the first argument (or named by `CLANRAID_CONFIG`)
//! is loaded first; otherwise everything comes from `CLANRAID_*`
//! environment variables. Logs go to stderr, filtered by `RUST_LOG`.

mod command;
mod console;

use std::path::Path;

use clanraid_sync::{ChannelSurface, ConfigError, Session, SyncConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application entry point.
///
/// Initializes logging, loads configuration, bootstraps the session,
/// starts the long-poll loop and runs the console until the user quits.
///
/// # Errors
///
/// Returns an error if configuration is invalid, bootstrap fails, or
/// stdin cannot be read.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!("clanraid starting");

    let config = load_config()?;
    info!(
        endpoint = config.endpoint(),
        request_timeout_ms = config.request_timeout_ms,
        poll_wait_budget_secs = config.poll_wait_budget_secs,
        poll_hard_timeout_secs = config.poll_hard_timeout_secs,
        "configuration loaded"
    );

    let (surface, events) = ChannelSurface::new();
    let session = Session::connect(&config, surface).await?;
    let poll = session.start_polling()?;

    let group = &session.data().group;
    println!(
        "connected to {} ({}), {} members{}",
        group.group_name.as_deref().unwrap_or("unnamed group"),
        group.group_id,
        session.store().roster().len(),
        if session.data().is_admin { ", admin" } else { "" }
    );
    println!("type `help` for commands");

    let result = console::run(&session, &poll, events).await;

    session.shutdown();
    let exit = poll.join().await;
    info!(exit = ?exit, "clanraid stopped");

    result?;
    Ok(())
}

/// Load configuration from a YAML file if one is named, else from env.
fn load_config() -> Result<SyncConfig, ConfigError> {
    match std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os("CLANRAID_CONFIG"))
    {
        Some(path) => SyncConfig::from_file(Path::new(&path)),
        None => SyncConfig::from_env(),
    }
}
