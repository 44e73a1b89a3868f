use clap::{Args, Parser, Subcommand};

use crate::types::LogLevel;
use crate::upload::client::DEFAULT_ENDPOINT;

#[derive(Parser, Debug)]
#[command(
    name = "gyazo-uploader",
    version,
    about = "Upload local photos to Gyazo, once each"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Upload photos not yet in the ledger (default)
    Upload(UploadArgs),

    /// Show the ledger location and how many photos it records
    Status(StatusArgs),

    /// List the photos the next upload would send
    Pending(PendingArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Ledger file recording uploaded photos
    #[arg(long, global = true, default_value = "~/.gyazo-uploader/identifiers.csv")]
    pub ledger: String,

    /// Gyazo API access token.
    /// Prefer the GYAZO_ACCESS_TOKEN environment variable; command-line
    /// arguments are visible in process listings.
    #[arg(long, global = true, env = "GYAZO_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Upload endpoint
    #[arg(long, global = true, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Record only local identifiers in the ledger, without Gyazo image ids
    #[arg(long, global = true)]
    pub no_remote_id: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = 120)]
    pub timeout: u64,

    /// Max retries per upload on transient failures (0 = no retries)
    #[arg(long, global = true, default_value_t = 2)]
    pub max_retries: u32,

    /// Base delay in seconds between retries
    #[arg(long, global = true, default_value_t = 5)]
    pub retry_delay: u64,

    /// Log level
    #[arg(long, global = true, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Disable progress bar
    #[arg(long, global = true)]
    pub no_progress_bar: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct UploadArgs {
    /// Photo library directory
    #[arg(long)]
    pub library: Option<String>,

    /// Only consider the first N photos in the library
    #[arg(long)]
    pub cap: Option<usize>,

    /// List what would be uploaded without uploading
    #[arg(long)]
    pub dry_run: bool,

    /// Run continuously, waiting N seconds between batches
    #[arg(long)]
    pub watch_with_interval: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Also count photos in this library that are not uploaded yet
    #[arg(long)]
    pub library: Option<String>,

    /// Report whether this photo identifier has been uploaded
    #[arg(long)]
    pub photo: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct PendingArgs {
    /// Photo library directory
    #[arg(long)]
    pub library: String,

    /// Only consider the first N photos in the library
    #[arg(long)]
    pub cap: Option<usize>,
}

impl Cli {
    /// The subcommand to run; a bare invocation means `upload`.
    pub fn effective_command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Upload(UploadArgs::default()))
    }
}
