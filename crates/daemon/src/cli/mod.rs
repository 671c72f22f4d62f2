use std::path::PathBuf;

use clap::Parser;
use url::Url;

pub mod op;
pub mod ops;

crate::command_enum! {
    (Daemon, ops::Daemon),
    (Upload, ops::Upload),
    (Get, ops::Get),
    (Ls, ops::Ls),
    (Rm, ops::Rm),
    (Ttl, ops::Ttl),
    (Clean, ops::Clean),
    (Notify, ops::Notify),
    (Gc, ops::Gc),
    (Housekeeping, ops::Housekeeping),
    (Resign, ops::Resign),
    (Health, ops::Health),
    (Version, ops::Version),
}

/// Ephemeral artifact storage on CVMFS.
#[derive(Parser, Debug)]
#[command(name = "ephemeral", version, about)]
pub struct Cli {
    /// Daemon API address
    #[arg(
        long,
        global = true,
        env = "EPHEMERAL_REMOTE",
        default_value = "http://localhost:81"
    )]
    pub remote: Url,

    /// Path to the daemon config file
    #[arg(long, global = true, env = "EPHEMERAL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}
