//! Marketplace command-line client
//!
//! Runs one command against the marketplace API and prints the resulting
//! envelope as JSON on stdout:
//! 1. Parse arguments with clap, initialize tracing (logs go to stderr)
//! 2. Load `marketplace.toml` and the credentials file it points at
//! 3. Run the command through `ApiClient`, which refreshes expired tokens
//! 4. Print `{ success, data | error }`; exit 1 when `success` is false
//!    (clap exits 2 on usage errors)

mod cli;
mod config;
mod error;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use api_client::{ApiClient, ApiResponse, ListingQuery};
use common::Secret;
use credentials::FileCredentialStore;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};
use crate::config::Config;

const PASSWORD_ENV: &str = "MARKETPLACE_PASSWORD";

fn init_tracing(pretty: bool) {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if pretty {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.pretty);

    let config_path = Config::resolve_path(cli.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let store = FileCredentialStore::load(config.credentials.path.clone())
        .await
        .with_context(|| {
            format!(
                "failed to read credentials from {}",
                config.credentials.path.display()
            )
        })?;
    let client = ApiClient::new(config.client_config(), Arc::new(store))
        .context("invalid API client configuration")?;
    info!(
        base_url = %config.api.base_url,
        credentials = %config.credentials.path.display(),
        "client ready"
    );

    let succeeded = run(&client, cli.command).await?;
    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Run one command and print its envelope. Returns whether the call succeeded.
async fn run(client: &ApiClient, command: Command) -> Result<bool> {
    debug!(?command, "running command");
    match command {
        Command::Login { email } => {
            let password = std::env::var(PASSWORD_ENV)
                .map(Secret::new)
                .map_err(|_| error::Error::MissingPassword)?;
            print(&client.login(&email, password.expose()).await)
        }
        Command::Logout => print(&client.logout().await),
        Command::Me => print(&client.me().await),
        Command::Listings { page, search } => {
            let query = ListingQuery {
                page,
                search,
                ..Default::default()
            };
            print(&client.list_listings(&query).await)
        }
        Command::Listing { id } => print(&client.get_listing(&id).await),
        Command::Connections => print(&client.list_connections().await),
        Command::Plans => print(&client.list_plans().await),
        Command::Subscription => print(&client.current_subscription().await),
        Command::Get { path } => print(&client.get::<Value>(&path).await),
    }
}

fn print<T: Serialize>(response: &ApiResponse<T>) -> Result<bool> {
    println!("{}", render(response)?);
    Ok(response.is_success())
}

fn render<T: Serialize>(response: &ApiResponse<T>) -> Result<String> {
    serde_json::to_string_pretty(response).context("failed to serialize response")
}
