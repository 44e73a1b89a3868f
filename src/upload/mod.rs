//! Upload pipeline: drains one batch strictly in order.
//!
//! For each photo: fetch bytes, send (with retries on transient failures),
//! record in the ledger, advance progress. Only then does the next photo
//! start, so one image's bytes are in memory at a time and the endpoint sees
//! at most one request. A photo that fails at any stage is recorded in the
//! [`BatchReport`] and the batch moves on.

pub mod client;
pub mod error;
pub mod progress;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::ledger::Ledger;
use crate::library::{LocalPhotoRef, PhotoSource};
use crate::retry::{self, RetryAction, RetryConfig};

pub use client::{GyazoClient, Uploader};
pub use error::{ItemError, PipelineError, UploadError};
pub use progress::{ProgressReporter, ProgressState};

/// Outcome of one batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: Vec<(LocalPhotoRef, ItemError)>,
    /// Cancellation stopped the batch before every photo was attempted.
    pub cancelled: bool,
}

impl BatchReport {
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Photos never attempted because the batch was cancelled.
    pub fn skipped(&self) -> usize {
        self.total - self.succeeded - self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs batches one at a time.
#[derive(Debug, Default)]
pub struct UploadPipeline {
    retry: RetryConfig,
    busy: AtomicBool,
}

/// Clears the busy flag when the batch ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl UploadPipeline {
    pub fn new(retry: RetryConfig) -> Self {
        Self {
            retry,
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Upload `batch` in order, recording each success in `ledger`.
    ///
    /// Cancellation is checked before each photo; a photo already in flight
    /// finishes normally. Refuses to start while another batch is running on
    /// this pipeline.
    pub async fn run_batch(
        &self,
        batch: Vec<LocalPhotoRef>,
        source: &dyn PhotoSource,
        uploader: &dyn Uploader,
        ledger: &mut Ledger,
        reporter: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, PipelineError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PipelineError::Busy);
        }
        let _guard = BusyGuard(&self.busy);

        let started = Instant::now();
        let mut report = BatchReport {
            total: batch.len(),
            ..Default::default()
        };
        reporter.reset(batch.len());

        for photo in batch {
            if cancel.is_cancelled() {
                reporter.suspend(|| tracing::info!("Shutdown requested, stopping new uploads"));
                report.cancelled = true;
                break;
            }
            reporter.set_current(&photo.id);

            match self.upload_one(&photo, source, uploader, ledger).await {
                Ok((remote_id, count)) => {
                    reporter.suspend(|| {
                        tracing::info!(
                            id = %photo.id,
                            remote_id = %remote_id,
                            recorded = count,
                            "Uploaded"
                        )
                    });
                    report.succeeded += 1;
                    reporter.advance();
                }
                Err(e) => {
                    reporter.suspend(|| tracing::error!(id = %photo.id, "Upload failed: {}", e));
                    report.failed.push((photo, e));
                }
            }
        }

        reporter.finish();
        log_summary(&report, started.elapsed());
        Ok(report)
    }

    /// Fetch, send and record one photo. Returns the remote id and the new
    /// ledger size.
    async fn upload_one(
        &self,
        photo: &LocalPhotoRef,
        source: &dyn PhotoSource,
        uploader: &dyn Uploader,
        ledger: &mut Ledger,
    ) -> Result<(String, usize), ItemError> {
        let data = source.fetch_bytes(photo).await?;

        let remote_id = retry::retry_with_backoff(
            &self.retry,
            |e: &UploadError| {
                if e.is_retryable() {
                    RetryAction::Retry
                } else {
                    RetryAction::Abort
                }
            },
            || uploader.send(&data, photo),
        )
        .await?;

        let count = ledger.append(&photo.id, &remote_id).await?;
        Ok((remote_id, count))
    }
}

fn log_summary(report: &BatchReport, elapsed: Duration) {
    tracing::info!("── Summary ──");
    tracing::info!(
        "  {} uploaded, {} failed, {} total",
        report.succeeded,
        report.failed_count(),
        report.total
    );
    if report.cancelled {
        tracing::info!("  {} not attempted (interrupted)", report.skipped());
    }
    tracing::info!("  elapsed: {}", format_duration(elapsed));
}

fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}
