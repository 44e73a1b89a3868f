//! Graceful shutdown.
//!
//! The first SIGINT, SIGTERM or SIGHUP cancels a [`CancellationToken`]. The
//! upload pipeline lets the photo in flight finish and records it, then starts
//! no further uploads; watch mode stops waiting for the next pass. A second
//! signal exits immediately with status 130.

use std::sync::atomic::{AtomicU32, Ordering};

use tokio_util::sync::CancellationToken;

/// Exit status for a forced exit, as for a shell-interrupted process.
const FORCED_EXIT_CODE: i32 = 130;

/// What a received signal asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignalAction {
    /// Stop after the current upload.
    Drain,
    /// Exit now, abandoning the current upload.
    ForceExit,
}

/// Count one received signal. The first drains and cancels `token`.
fn on_signal(received: &AtomicU32, token: &CancellationToken) -> SignalAction {
    if received.fetch_add(1, Ordering::SeqCst) == 0 {
        token.cancel();
        SignalAction::Drain
    } else {
        SignalAction::ForceExit
    }
}

/// Listeners for SIGINT, SIGTERM and SIGHUP, registered up front.
#[cfg(unix)]
struct Signals {
    sigterm: tokio::signal::unix::Signal,
    sighup: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sighup: signal(SignalKind::hangup())?,
        })
    }

    async fn recv(&mut self) -> bool {
        tokio::select! {
            r = tokio::signal::ctrl_c() => r.is_ok(),
            _ = self.sigterm.recv() => true,
            _ = self.sighup.recv() => true,
        }
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn register() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> bool {
        tokio::signal::ctrl_c().await.is_ok()
    }
}

/// Install signal handlers and return the token they cancel.
pub(crate) fn install_signal_handler() -> anyhow::Result<CancellationToken> {
    let token = CancellationToken::new();
    let mut signals = Signals::register()?;

    let handler_token = token.clone();
    tokio::spawn(async move {
        let received = AtomicU32::new(0);
        while signals.recv().await {
            match on_signal(&received, &handler_token) {
                SignalAction::Drain => {
                    tracing::info!(
                        "Stopping: the upload in progress will be recorded, no new uploads will start"
                    );
                    tracing::info!("Signal again to quit without waiting");
                }
                SignalAction::ForceExit => {
                    tracing::warn!("Quitting now; the upload in progress is not recorded");
                    std::process::exit(FORCED_EXIT_CODE);
                }
            }
        }
        tracing::warn!("Signal listener stopped; shutdown requests will be ignored");
    });

    Ok(token)
}
