//! Concurrent processing of many videos.
//!
//! Each video runs on a blocking worker thread; at most `jobs` videos are in
//! flight at once. Per-video failures become failed report entries. Only a
//! fatal error stops the run.

use crate::error::{Error, Result};
use crate::output::{PredictionReport, ReportEntry};
use crate::pipeline::aggregate::VideoPrediction;
use crate::pipeline::processor::{VideoPipeline, process_video};
use indicatif::ProgressBar;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

/// Grace period for stalled workers when the runtime shuts down.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Scheduling options for a run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Videos processed concurrently (0 = available parallelism).
    pub jobs: usize,
    /// Per-video wall-clock budget.
    pub timeout: Option<Duration>,
}

impl RunOptions {
    /// Worker count with 0 resolved to the machine's parallelism.
    #[must_use]
    pub fn resolved_jobs(&self) -> usize {
        if self.jobs == 0 {
            std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
        } else {
            self.jobs
        }
    }
}

/// Stop signals shared by the run and its workers.
#[derive(Clone)]
struct StopFlags {
    cancel: Arc<AtomicBool>,
    fatal: Arc<AtomicBool>,
}

impl StopFlags {
    fn stopping(&self) -> bool {
        self.cancel.load(Ordering::Relaxed) || self.fatal.load(Ordering::Relaxed)
    }
}

/// Process every video and assemble the report in input order.
///
/// Setting `cancel` stops new videos from starting; videos in flight are
/// abandoned at their next frame and every unfinished video is reported as
/// cancelled. A fatal error (exhausted inference retries or malformed model
/// output) stops the run and is returned instead of a report.
pub fn run_videos(
    videos: &[PathBuf],
    pipeline: &Arc<VideoPipeline>,
    options: &RunOptions,
    cancel: Arc<AtomicBool>,
    progress: Option<&ProgressBar>,
) -> Result<PredictionReport> {
    let runtime = tokio::runtime::Runtime::new().map_err(|e| Error::Internal {
        message: format!("Failed to create async runtime: {e}"),
    })?;

    let flags = StopFlags {
        cancel,
        fatal: Arc::new(AtomicBool::new(false)),
    };
    let result = runtime.block_on(schedule(videos, pipeline, options, &flags, progress));

    // Timed-out decoders may still be blocked in a read.
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn schedule(
    videos: &[PathBuf],
    pipeline: &Arc<VideoPipeline>,
    options: &RunOptions,
    flags: &StopFlags,
    progress: Option<&ProgressBar>,
) -> Result<PredictionReport> {
    let jobs = options.resolved_jobs();
    debug!("Processing {} video(s) with {jobs} worker(s)", videos.len());

    let mut results: Vec<Option<ReportEntry>> = vec![None; videos.len()];
    let mut pending = videos.iter().cloned().enumerate();
    let mut tasks = JoinSet::new();
    let mut fatal: Option<Error> = None;

    loop {
        while tasks.len() < jobs && !flags.stopping() {
            let Some((index, video)) = pending.next() else {
                break;
            };
            tasks.spawn(run_one(
                index,
                video,
                Arc::clone(pipeline),
                options.timeout,
                flags.clone(),
            ));
        }

        let Some(joined) = tasks.join_next().await else {
            break;
        };
        let (index, video, result) = joined.map_err(|e| Error::Internal {
            message: format!("video task failed: {e}"),
        })?;

        if let Some(pb) = progress {
            pb.inc(1);
        }

        match result {
            Err(e) if e.is_fatal() => {
                error!("Fatal error on {}: {e}", video.display());
                flags.fatal.store(true, Ordering::Relaxed);
                fatal.get_or_insert(e);
            }
            Err(Error::Cancelled) => {
                debug!("Cancelled: {}", video.display());
                results[index] = Some(ReportEntry::from_result(&video, Err(Error::Cancelled)));
            }
            Err(e) => {
                error!("Failed to process {}: {e}", video.display());
                results[index] = Some(ReportEntry::from_result(&video, Err(e)));
            }
            Ok(prediction) => results[index] = Some(ReportEntry::Predicted(prediction)),
        }
    }

    if let Some(e) = fatal {
        return Err(e);
    }

    let unstarted = results.iter().filter(|r| r.is_none()).count();
    if unstarted > 0 {
        warn!("Run cancelled, {unstarted} video(s) not processed");
    }

    let entries = videos
        .iter()
        .zip(results)
        .map(|(video, entry)| {
            entry.unwrap_or_else(|| ReportEntry::from_result(video, Err(Error::Cancelled)))
        })
        .collect();
    Ok(PredictionReport::new(entries))
}

/// Process one video on a blocking thread within its time budget.
async fn run_one(
    index: usize,
    video: PathBuf,
    pipeline: Arc<VideoPipeline>,
    timeout: Option<Duration>,
    flags: StopFlags,
) -> (usize, PathBuf, Result<VideoPrediction>) {
    let abort = Arc::new(AtomicBool::new(false));

    let handle = {
        let video = video.clone();
        let abort = Arc::clone(&abort);
        tokio::task::spawn_blocking(move || {
            let should_stop = || flags.stopping() || abort.load(Ordering::Relaxed);
            process_video(&video, &pipeline, &should_stop)
        })
    };

    let joined = match timeout {
        Some(budget) => match tokio::time::timeout(budget, handle).await {
            Ok(joined) => joined,
            Err(_) => {
                abort.store(true, Ordering::Relaxed);
                let err = Error::UnreadableVideo {
                    path: video.clone(),
                    reason: format!("timed out after {}s", budget.as_secs_f64()),
                };
                return (index, video, Err(err));
            }
        },
        None => handle.await,
    };

    let result = joined.unwrap_or_else(|e| {
        Err(Error::Internal {
            message: format!("worker for {} panicked: {e}", video.display()),
        })
    });
    (index, video, result)
}
