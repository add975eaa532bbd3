use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

/// Inspect how the FlatScout worker routes requests, renders notifications
/// and evicts caches.
#[derive(Parser, Debug)]
#[command(name = "flatscout-sw", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Worker configuration file (TOML). Defaults are used when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format for all subcommands.
    #[arg(long, value_enum, default_value = "human", global = true)]
    pub output: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show which strategy and cache namespace would serve a request.
    Route(RouteArgs),

    /// Normalize a push payload into the notification that would be shown.
    Notify(NotifyArgs),

    /// Resolve the URL a notification click would open.
    ClickTarget(ClickTargetArgs),

    /// List the namespaces and entry counts in a cache snapshot.
    Caches(SnapshotArg),

    /// Show which namespaces activation would delete from a snapshot.
    Activate(ActivateArgs),

    /// Print the effective worker configuration as TOML.
    Config,
}

#[derive(Args, Debug)]
pub struct RouteArgs {
    /// Absolute URL, or a path on the configured origin.
    pub url: String,

    /// HTTP method.
    #[arg(long, default_value = "GET")]
    pub method: String,

    /// Treat the request as a page navigation.
    #[arg(long)]
    pub navigate: bool,
}

#[derive(Args, Debug)]
pub struct NotifyArgs {
    /// Push payload JSON, or `-` to read it from stdin.
    pub payload: String,
}

#[derive(Args, Debug)]
pub struct ClickTargetArgs {
    /// Notification data JSON, e.g. `{"type":"new_flat","flatId":"abc"}`.
    pub data: String,
}

#[derive(Args, Debug)]
pub struct SnapshotArg {
    /// Path to a cache snapshot (JSON).
    pub snapshot: PathBuf,
}

#[derive(Args, Debug)]
pub struct ActivateArgs {
    /// Path to a cache snapshot (JSON).
    pub snapshot: PathBuf,

    /// Rewrite the snapshot with the evicted namespaces removed.
    #[arg(long)]
    pub write: bool,
}
