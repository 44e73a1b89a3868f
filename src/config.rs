use std::path::PathBuf;
use std::time::Duration;

use crate::cli::GlobalArgs;
use crate::ledger::RecordFormat;
use crate::retry::RetryConfig;

/// Upper bound on the backoff between upload retries.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Settings shared by every command.
pub struct Config {
    pub ledger_path: PathBuf,
    pub access_token: Option<String>,
    pub endpoint: String,
    pub timeout: Duration,
    pub retry: RetryConfig,
    pub record_format: RecordFormat,
    pub no_progress_bar: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("ledger_path", &self.ledger_path)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("record_format", &self.record_format)
            .finish_non_exhaustive()
    }
}

pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    pub fn from_cli(args: &GlobalArgs) -> anyhow::Result<Self> {
        if args.ledger.trim().is_empty() {
            anyhow::bail!("--ledger must not be empty");
        }
        if !(args.endpoint.starts_with("http://") || args.endpoint.starts_with("https://")) {
            anyhow::bail!(
                "--endpoint must be an http(s) URL, got '{}'",
                args.endpoint
            );
        }
        if args.timeout == 0 {
            anyhow::bail!("--timeout must be at least 1 second");
        }

        let access_token = args
            .access_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Ok(Self {
            ledger_path: expand_tilde(&args.ledger),
            access_token,
            endpoint: args.endpoint.clone(),
            timeout: Duration::from_secs(args.timeout),
            retry: RetryConfig {
                max_retries: args.max_retries,
                base_delay: Duration::from_secs(args.retry_delay),
                max_delay: MAX_RETRY_DELAY,
            },
            record_format: RecordFormat::from_record_remote_id(!args.no_remote_id),
            no_progress_bar: args.no_progress_bar,
        })
    }

    /// The access token, required by commands that talk to Gyazo.
    pub fn require_access_token(&self) -> anyhow::Result<&str> {
        self.access_token.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "An access token is required to upload. \
                 Set GYAZO_ACCESS_TOKEN or pass --access-token."
            )
        })
    }
}

/// Resolve the `--library` argument of a command that needs one.
pub fn library_dir(library: Option<&str>) -> anyhow::Result<PathBuf> {
    match library.map(str::trim).filter(|l| !l.is_empty()) {
        Some(dir) => Ok(expand_tilde(dir)),
        None => anyhow::bail!("--library is required for uploading"),
    }
}
