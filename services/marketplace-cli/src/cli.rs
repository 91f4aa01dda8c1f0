//! Command-line arguments

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "marketplace", version, about = "Marketplace API command-line client")]
pub struct Cli {
    /// Config file (falls back to CONFIG_PATH, then marketplace.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Human-readable logs instead of JSON
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Log in (password from MARKETPLACE_PASSWORD)
    Login { email: String },
    /// End the session and forget stored tokens
    Logout,
    /// Show the logged-in user
    Me,
    /// List practice listings
    Listings {
        page: Option<u32>,
        /// Free-text search
        search: Option<String>,
    },
    /// Show one listing
    Listing { id: String },
    /// List connection requests
    Connections,
    /// List subscription plans
    Plans,
    /// Show the current subscription
    Subscription,
    /// GET any API path and print the envelope
    Get { path: String },
}
