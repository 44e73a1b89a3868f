//! Batch progress: a watch channel for observers plus an optional terminal bar.

use std::io::IsTerminal;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;

/// Uploaded/total counters for the running batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressState {
    pub uploaded: usize,
    pub total: usize,
}

/// Publishes [`ProgressState`] updates. Written only by the pipeline task.
pub struct ProgressReporter {
    tx: watch::Sender<ProgressState>,
    bar: ProgressBar,
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(ProgressBar::hidden())
    }
}

impl ProgressReporter {
    pub fn new(bar: ProgressBar) -> Self {
        let (tx, _rx) = watch::channel(ProgressState::default());
        Self { tx, bar }
    }

    /// Reporter drawing a terminal bar unless disabled or stdout is not a TTY.
    pub fn for_terminal(no_progress_bar: bool) -> Self {
        Self::new(create_progress_bar(no_progress_bar))
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressState> {
        self.tx.subscribe()
    }

    pub fn state(&self) -> ProgressState {
        *self.tx.borrow()
    }

    /// Start a new batch of `total` photos.
    pub fn reset(&self, total: usize) {
        self.tx.send_replace(ProgressState { uploaded: 0, total });
        self.bar.reset();
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
    }

    /// Count one more uploaded photo. Never passes `total`.
    pub fn advance(&self) {
        let mut advanced = false;
        self.tx.send_if_modified(|state| {
            if state.uploaded < state.total {
                state.uploaded += 1;
                advanced = true;
            }
            advanced
        });
        if advanced {
            self.bar.inc(1);
        }
    }

    /// Show which photo is being worked on.
    pub fn set_current(&self, id: &str) {
        self.bar.set_message(id.to_string());
    }

    /// Run `f` with the bar hidden so log lines do not tear it.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.bar.suspend(f)
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Create a progress bar with a consistent template.
///
/// Returns `ProgressBar::hidden()` when the user passed `--no-progress-bar` or
/// stdout is not a TTY (cron jobs, piped output).
fn create_progress_bar(no_progress_bar: bool) -> ProgressBar {
    if no_progress_bar || !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} uploaded ({eta}) {msg}",
        )
        .expect("valid template")
        .progress_chars("=> "),
    );
    pb
}
