// Job orchestrator - Holds the work list and runs jobs concurrently

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{broadcast, Notify, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::app::job::{Job, JobId, JobSnapshot};
use crate::domain::model::{ClipSpec, SourceVideo};
use crate::domain::rules::ClipValidator;
use crate::engine::{EncoderEvent, JobState, PassSequencer};
use crate::error::{EncodeError, EncodeResult};
use crate::ports::PassRunner;

/// Default capacity of each job's event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Which clips a run covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSelection {
    /// One clip by name, optionally narrowed to one video
    Clip { video: Option<String>, clip: String },
    /// Every clip of one video
    Video(String),
    /// Every clip of every video
    All,
}

impl JobSelection {
    pub fn from_names(video: Option<String>, clip: Option<String>) -> Self {
        match (video, clip) {
            (video, Some(clip)) => JobSelection::Clip { video, clip },
            (Some(video), None) => JobSelection::Video(video),
            (None, None) => JobSelection::All,
        }
    }

    /// Resolve the selection against a set of videos
    pub fn resolve<'a>(&self, videos: &'a [SourceVideo]) -> EncodeResult<Vec<&'a ClipSpec>> {
        match self {
            JobSelection::All => Ok(videos.iter().flat_map(|video| &video.clips).collect()),
            JobSelection::Video(name) => {
                let video = find_video(videos, name)?;
                Ok(video.clips.iter().collect())
            }
            JobSelection::Clip { video, clip } => {
                let candidates: Vec<&SourceVideo> = match video {
                    Some(name) => vec![find_video(videos, name)?],
                    None => videos.iter().collect(),
                };
                let matches: Vec<&ClipSpec> = candidates
                    .into_iter()
                    .flat_map(|video| &video.clips)
                    .filter(|candidate| candidate.label() == *clip)
                    .collect();
                match matches.len() {
                    0 => Err(EncodeError::Selection(format!("no clip named '{}'", clip))),
                    1 => Ok(matches),
                    n => Err(EncodeError::Selection(format!(
                        "{} clips are named '{}', pick a video",
                        n, clip
                    ))),
                }
            }
        }
    }
}

fn find_video<'a>(videos: &'a [SourceVideo], name: &str) -> EncodeResult<&'a SourceVideo> {
    videos
        .iter()
        .find(|video| video.name == name)
        .ok_or_else(|| EncodeError::Selection(format!("no video named '{}'", name)))
}

/// Shared pieces a running job task needs
#[derive(Clone)]
struct RunContext {
    encoder: PathBuf,
    runner: Arc<dyn PassRunner>,
    permits: Arc<Semaphore>,
    finished: Arc<Notify>,
}

/// Holds the ordered job list and runs jobs on the tokio runtime
pub struct JobOrchestrator {
    context: RunContext,
    jobs: Mutex<Vec<Arc<Job>>>,
    next_id: AtomicU64,
    event_capacity: usize,
}

impl JobOrchestrator {
    /// Orchestrator running at most `max_parallel` encoders at once
    pub fn new(encoder: impl Into<PathBuf>, runner: Arc<dyn PassRunner>, max_parallel: usize) -> Self {
        Self {
            context: RunContext {
                encoder: encoder.into(),
                runner,
                permits: Arc::new(Semaphore::new(max_parallel.max(1))),
                finished: Arc::new(Notify::new()),
            },
            jobs: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Validate a clip and append a Waiting job for it
    pub fn add(&self, clip: ClipSpec) -> EncodeResult<JobId> {
        ClipValidator::validate(&clip)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let job = Arc::new(Job::new(id, Arc::new(clip), self.event_capacity));
        debug!("Queued job {} for {}", id, job.clip().label());
        self.lock_jobs().push(job);
        Ok(id)
    }

    /// Add one job per selected clip. Nothing is added if any clip is invalid.
    pub fn add_selection(
        &self,
        videos: &[SourceVideo],
        selection: &JobSelection,
    ) -> EncodeResult<Vec<JobId>> {
        let clips = selection.resolve(videos)?;
        for clip in &clips {
            ClipValidator::validate(clip).map_err(|e| {
                EncodeError::Selection(format!("clip '{}' is invalid: {}", clip.label(), e))
            })?;
        }
        clips.into_iter().map(|clip| self.add(clip.clone())).collect()
    }

    /// Drop a job from the list. Running jobs must be cancelled first.
    pub fn remove(&self, id: JobId) -> EncodeResult<()> {
        let mut jobs = self.lock_jobs();
        let position = jobs
            .iter()
            .position(|job| job.id() == id)
            .ok_or(EncodeError::UnknownJob(id))?;

        let state = jobs[position].state();
        if state.is_running() {
            return Err(EncodeError::InvalidJobState {
                id,
                state: state.name().to_string(),
                action: "remove",
            });
        }
        let job = jobs.remove(position);
        // A launched job still queued for a permit must not start afterwards
        job.cancel_handle().cancel();
        Ok(())
    }

    pub fn job(&self, id: JobId) -> Option<Arc<Job>> {
        self.lock_jobs().iter().find(|job| job.id() == id).cloned()
    }

    pub fn jobs(&self) -> Vec<Arc<Job>> {
        self.lock_jobs().clone()
    }

    pub fn snapshots(&self) -> Vec<JobSnapshot> {
        self.lock_jobs().iter().map(|job| job.snapshot()).collect()
    }

    pub fn subscribe(&self, id: JobId) -> EncodeResult<broadcast::Receiver<EncoderEvent>> {
        self.job(id)
            .map(|job| job.subscribe())
            .ok_or(EncodeError::UnknownJob(id))
    }

    /// Launch one Waiting job
    pub fn start(&self, id: JobId) -> EncodeResult<JoinHandle<()>> {
        let job = self.job(id).ok_or(EncodeError::UnknownJob(id))?;
        if !job.try_launch() {
            return Err(EncodeError::InvalidJobState {
                id,
                state: job.state().name().to_string(),
                action: "start",
            });
        }
        Ok(self.spawn(job))
    }

    /// Launch every job that has not been started yet
    pub fn start_all(&self) -> Vec<JoinHandle<()>> {
        let pending: Vec<Arc<Job>> = self
            .jobs()
            .into_iter()
            .filter(|job| job.try_launch())
            .collect();
        info!("Starting {} job(s)", pending.len());
        pending.into_iter().map(|job| self.spawn(job)).collect()
    }

    /// Cancel one job. Returns `false` if it had already finished.
    pub fn cancel(&self, id: JobId) -> EncodeResult<bool> {
        let job = self.job(id).ok_or(EncodeError::UnknownJob(id))?;
        let cancelled = job.cancel();
        if cancelled {
            info!("Cancellation requested for job {}", id);
            self.context.finished.notify_waiters();
        }
        Ok(cancelled)
    }

    /// Cancel every job that is not terminal; returns how many were affected
    pub fn cancel_all(&self) -> usize {
        let count = self.jobs().iter().filter(|job| job.cancel()).count();
        if count > 0 {
            info!("Cancellation requested for {} job(s)", count);
            self.context.finished.notify_waiters();
        }
        count
    }

    /// Every job is Done, Failed or Cancelled
    pub fn all_done(&self) -> bool {
        self.lock_jobs().iter().all(|job| job.is_terminal())
    }

    /// Wait until [`all_done`](Self::all_done) holds, in whatever order jobs finish
    pub async fn wait_all(&self) {
        loop {
            let notified = self.context.finished.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.all_done() {
                return;
            }
            notified.await;
        }
    }

    fn spawn(&self, job: Arc<Job>) -> JoinHandle<()> {
        let span = info_span!("job", id = job.id(), clip = %job.clip().label());
        tokio::spawn(drive(job, self.context.clone()).instrument(span))
    }

    fn lock_jobs(&self) -> MutexGuard<'_, Vec<Arc<Job>>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Run one job to a terminal state
async fn drive(job: Arc<Job>, context: RunContext) {
    let cancel = job.cancel_handle().clone();

    let permit = tokio::select! {
        permit = context.permits.clone().acquire_owned() => permit.ok(),
        _ = cancel.cancelled() => None,
    };
    let Some(_permit) = permit else {
        job.finish(JobState::Cancelled);
        context.finished.notify_waiters();
        return;
    };

    let listener = tokio::spawn(track_progress(Arc::clone(&job), job.subscribe()));
    let sequencer = PassSequencer::new(
        Arc::clone(job.clip()),
        context.encoder.clone(),
        Arc::clone(&context.runner),
    );

    let outcome = sequencer
        .run(&cancel, job.events(), |state| job.mark_running(state))
        .await;

    match outcome.passes.last().and_then(|pass| pass.last_sample) {
        Some(sample) => job.record_sample(sample),
        None if !outcome.passes.is_empty() => job.clear_sample(),
        None => {}
    }
    match &outcome.state {
        JobState::Failed { reason, .. } => warn!("Job {} failed: {}", job.id(), reason),
        state => info!("Job {} finished: {}", job.id(), state.name()),
    }
    if !job.finish(outcome.state) {
        debug!("Job {} was already terminal", job.id());
    }
    listener.abort();
    context.finished.notify_waiters();
}

/// Keep the job's latest sample current while it runs
async fn track_progress(job: Arc<Job>, mut events: broadcast::Receiver<EncoderEvent>) {
    loop {
        match events.recv().await {
            Ok(EncoderEvent::Progress { sample }) => job.record_sample(sample),
            Ok(EncoderEvent::PassStarted { .. }) => job.clear_sample(),
            Ok(EncoderEvent::State { state }) if state.is_terminal() => break,
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!("Progress tracker skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
