// Job - runtime record of one clip's encode attempt

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::domain::model::ClipSpec;
use crate::engine::{CancelHandle, EncoderEvent, JobState, ProgressSample};

pub type JobId = u64;

/// Point-in-time view of a job for listings and JSON output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub clip: String,
    pub output: PathBuf,
    #[serde(flatten)]
    pub state: JobState,
    pub progress: Option<ProgressSample>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct JobRecord {
    state: JobState,
    latest: Option<ProgressSample>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    launched: bool,
}

/// One clip to encode. Holds an immutable snapshot of the clip settings.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    clip: Arc<ClipSpec>,
    record: Mutex<JobRecord>,
    cancel: CancelHandle,
    events: broadcast::Sender<EncoderEvent>,
}

impl Job {
    pub fn new(id: JobId, clip: Arc<ClipSpec>, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            id,
            clip,
            record: Mutex::new(JobRecord {
                state: JobState::Waiting,
                latest: None,
                started_at: None,
                finished_at: None,
                launched: false,
            }),
            cancel: CancelHandle::new(),
            events,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn clip(&self) -> &Arc<ClipSpec> {
        &self.clip
    }

    pub fn state(&self) -> JobState {
        self.lock().state.clone()
    }

    pub fn is_terminal(&self) -> bool {
        self.lock().state.is_terminal()
    }

    /// Most recent sample of whichever pass is active
    pub fn latest_sample(&self) -> Option<ProgressSample> {
        self.lock().latest
    }

    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }

    pub fn events(&self) -> &broadcast::Sender<EncoderEvent> {
        &self.events
    }

    /// Receive this job's output, progress and state events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EncoderEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let record = self.lock();
        JobSnapshot {
            id: self.id,
            clip: self.clip.label(),
            output: self.clip.output.clone(),
            state: record.state.clone(),
            progress: record.latest,
            started_at: record.started_at,
            finished_at: record.finished_at,
        }
    }

    /// Claim the job for execution. Fails if it was already launched or is terminal.
    pub(crate) fn try_launch(&self) -> bool {
        let mut record = self.lock();
        if record.launched || record.state.is_terminal() {
            return false;
        }
        record.launched = true;
        true
    }

    /// Enter a Running state unless the job already finished. A new pass
    /// starts without a sample.
    pub(crate) fn mark_running(&self, state: &JobState) {
        let mut record = self.lock();
        if record.state.is_terminal() {
            return;
        }
        if record.started_at.is_none() {
            record.started_at = Some(Utc::now());
        }
        if record.state != *state {
            record.latest = None;
        }
        record.state = state.clone();
    }

    /// Drop the sample of a pass that has ended
    pub(crate) fn clear_sample(&self) {
        self.lock().latest = None;
    }

    pub(crate) fn record_sample(&self, sample: ProgressSample) {
        self.lock().latest = Some(sample);
    }

    /// Move to a terminal state. Only the first call succeeds; later calls
    /// leave the state untouched and publish nothing.
    pub(crate) fn finish(&self, state: JobState) -> bool {
        {
            let mut record = self.lock();
            if record.state.is_terminal() {
                return false;
            }
            record.state = state.clone();
            record.finished_at = Some(Utc::now());
        }
        let _ = self.events.send(EncoderEvent::State { state });
        true
    }

    /// Request cancellation. A job that was never launched becomes
    /// Cancelled right away; a launched one reaches Cancelled through its
    /// task once nothing of it is left running. Returns `false` when the job
    /// was already terminal.
    pub fn cancel(&self) -> bool {
        let unlaunched = {
            let mut record = self.lock();
            if record.state.is_terminal() {
                return false;
            }
            if !record.launched {
                record.state = JobState::Cancelled;
                record.finished_at = Some(Utc::now());
            }
            !record.launched
        };
        self.cancel.cancel();
        if unlaunched {
            let _ = self.events.send(EncoderEvent::State {
                state: JobState::Cancelled,
            });
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, JobRecord> {
        // A poisoned record still holds a consistent state value
        self.record.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
