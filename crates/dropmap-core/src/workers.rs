//! # Workers
//!
//! A bounded rayon pool that runs renders off the caller's thread.
//!
//! Each submitted job loads its telemetry file, normalizes it and renders it
//! on a pool thread; the caller gets a channel that yields exactly one result.
//! With a [`Janitor`] attached, the job's output (and its telemetry file, if
//! the caller owns it) is scheduled for deletion whatever the outcome.

use crate::cleanup::Janitor;
use crate::compose::{Compositor, RenderOutcome, RenderRequest};
use crate::errors::TraceError;
use crate::telemetry::{load_log, MatchTimeline};
use crossbeam_channel::{bounded, Receiver};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info_span};

/// One unit of work for the pool.
#[derive(Clone, Debug)]
pub struct RenderJob {
    pub telemetry_path: PathBuf,
    pub request: RenderRequest,
    /// Delete the telemetry file along with the output.
    pub discard_telemetry: bool,
}

impl RenderJob {
    pub fn new(telemetry_path: impl Into<PathBuf>, request: RenderRequest) -> Self {
        Self {
            telemetry_path: telemetry_path.into(),
            request,
            discard_telemetry: false,
        }
    }

    pub fn discard_telemetry(mut self, discard: bool) -> Self {
        self.discard_telemetry = discard;
        self
    }
}

pub type RenderResult = Result<RenderOutcome, TraceError>;

/// Runs render jobs on a fixed number of threads.
pub struct RenderPool {
    pool: ThreadPool,
    compositor: Arc<Compositor>,
    janitor: Option<Arc<Janitor>>,
}

impl std::fmt::Debug for RenderPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPool")
            .field("threads", &self.pool.current_num_threads())
            .field("janitor", &self.janitor.is_some())
            .finish()
    }
}

impl RenderPool {
    /// `threads == 0` lets rayon choose.
    pub fn new(compositor: Compositor, threads: usize) -> Result<Self, TraceError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("dropmap-render-{}", i))
            .build()
            .map_err(|e| TraceError::Pool(e.to_string()))?;
        Ok(Self {
            pool,
            compositor: Arc::new(compositor),
            janitor: None,
        })
    }

    pub fn with_janitor(mut self, janitor: Arc<Janitor>) -> Self {
        self.janitor = Some(janitor);
        self
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queues a job. The receiver yields its result once.
    pub fn submit(&self, job: RenderJob) -> Receiver<RenderResult> {
        let (tx, rx) = bounded(1);
        let compositor = Arc::clone(&self.compositor);
        let janitor = self.janitor.clone();

        self.pool.spawn(move || {
            let span = info_span!(
                "render_job",
                player = %job.request.player,
                match_id = %job.request.match_id
            );
            let _guard = span.enter();

            let result = run_job(&compositor, &job);
            if let Err(e) = &result {
                error!("Render failed: {}", e);
            }
            if let Some(janitor) = janitor {
                schedule_cleanup(&janitor, &job, &result);
            }
            // the caller may have stopped listening
            let _ = tx.send(result);
        });
        rx
    }

    /// Submits a job and blocks for its result.
    pub fn render_blocking(&self, job: RenderJob) -> RenderResult {
        self.submit(job)
            .recv()
            .map_err(|_| TraceError::Pool("render worker exited without a result".into()))?
    }
}

fn run_job(compositor: &Compositor, job: &RenderJob) -> RenderResult {
    let events = load_log(&job.telemetry_path)?;
    let timeline = MatchTimeline::new(events);
    compositor.render(&timeline, &job.request)
}

fn schedule_cleanup(janitor: &Janitor, job: &RenderJob, result: &RenderResult) {
    let mut paths: Vec<PathBuf> = Vec::new();
    if let Some(output) = result.as_ref().ok().and_then(RenderOutcome::output_path) {
        paths.push(output.to_path_buf());
    }
    if job.discard_telemetry {
        paths.push(job.telemetry_path.clone());
    }
    janitor.schedule(paths);
}
