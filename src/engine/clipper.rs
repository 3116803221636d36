//! Pass sequencing for one clip
//!
//! Drives a clip through its encoder passes, one after the other, and reduces
//! the pass outcomes to a single job state.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::domain::model::ClipSpec;
use crate::engine::process::{pass_log_path, remove_pass_logs};
use crate::engine::{
    ArgumentBuilder, CancelHandle, EncoderCommand, EncoderEvent, PassExit, PassKind, PassResult,
};
use crate::error::{EncodeError, EncodeResult};
use crate::ports::PassRunner;

/// Lifecycle of a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Waiting,
    Running {
        pass: PassKind,
    },
    Done,
    Failed {
        /// Encoder exit code, `None` when the encoder never ran to exit
        exit_code: Option<i32>,
        reason: String,
        /// Last captured diagnostic lines
        diagnostics: Vec<String>,
    },
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Done | JobState::Failed { .. } | JobState::Cancelled
        )
    }

    pub fn is_running(&self) -> bool {
        matches!(self, JobState::Running { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            JobState::Waiting => "waiting",
            JobState::Running { .. } => "running",
            JobState::Done => "done",
            JobState::Failed { .. } => "failed",
            JobState::Cancelled => "cancelled",
        }
    }

    fn failed(exit_code: Option<i32>, reason: impl Into<String>, diagnostics: Vec<String>) -> Self {
        JobState::Failed {
            exit_code,
            reason: reason.into(),
            diagnostics,
        }
    }
}

/// Terminal state of a sequence plus the results of the passes that ran
#[derive(Debug, Clone)]
pub struct SequenceOutcome {
    pub state: JobState,
    pub passes: Vec<PassResult>,
}

/// Runs the one or two encoder passes of a clip
pub struct PassSequencer {
    clip: Arc<ClipSpec>,
    encoder: PathBuf,
    runner: Arc<dyn PassRunner>,
}

impl PassSequencer {
    pub fn new(clip: Arc<ClipSpec>, encoder: impl Into<PathBuf>, runner: Arc<dyn PassRunner>) -> Self {
        Self {
            clip,
            encoder: encoder.into(),
            runner,
        }
    }

    pub fn clip(&self) -> &ClipSpec {
        &self.clip
    }

    /// Commands for every pass, in execution order
    pub fn commands(&self) -> EncodeResult<Vec<EncoderCommand>> {
        PassKind::sequence(self.clip.two_pass)
            .iter()
            .map(|&pass| self.command(pass))
            .collect()
    }

    fn command(&self, pass: PassKind) -> EncodeResult<EncoderCommand> {
        ArgumentBuilder::for_clip(&self.clip)
            .with_pass(pass)
            .command(&self.encoder)
    }

    /// Run every pass until one fails or is cancelled. `on_state` sees each
    /// Running transition; the returned state is always terminal.
    pub async fn run<F>(
        &self,
        cancel: &CancelHandle,
        events: &broadcast::Sender<EncoderEvent>,
        mut on_state: F,
    ) -> SequenceOutcome
    where
        F: FnMut(&JobState) + Send,
    {
        let mut passes = Vec::new();

        for &pass in PassKind::sequence(self.clip.two_pass) {
            if cancel.is_cancelled() {
                self.discard_pass_logs();
                return SequenceOutcome {
                    state: JobState::Cancelled,
                    passes,
                };
            }

            if pass == PassKind::Second {
                let log = pass_log_path(&self.clip.output);
                if !log.exists() {
                    let err = EncodeError::MissingPassLog { path: log };
                    error!("{}", err);
                    remove_pass_logs(&self.clip.output);
                    return SequenceOutcome {
                        state: JobState::failed(None, err.to_string(), Vec::new()),
                        passes,
                    };
                }
            }

            let command = match self.command(pass) {
                Ok(command) => command,
                Err(e) => {
                    error!("Cannot build encoder arguments: {}", e);
                    self.discard_pass_logs();
                    return SequenceOutcome {
                        state: JobState::failed(None, e.to_string(), Vec::new()),
                        passes,
                    };
                }
            };

            let running = JobState::Running { pass };
            on_state(&running);
            let _ = events.send(EncoderEvent::State { state: running });
            let _ = events.send(EncoderEvent::PassStarted {
                pass,
                command: command.display(),
            });

            let result = match self.runner.run_pass(&command, cancel, events).await {
                Ok(result) => result,
                Err(e) => {
                    error!("Encoder {} failed to run: {}", pass, e);
                    self.discard_after(pass);
                    return SequenceOutcome {
                        state: JobState::failed(None, e.to_string(), Vec::new()),
                        passes,
                    };
                }
            };
            let _ = events.send(EncoderEvent::PassFinished {
                pass,
                exit: result.exit,
            });

            let exit = result.exit;
            let diagnostics = result.diagnostics.clone();
            passes.push(result);

            match exit {
                PassExit::Code(0) => info!("Finished {} of {}", pass, self.clip.label()),
                PassExit::Cancelled => {
                    info!("Cancelled during {}", pass);
                    self.discard_after(pass);
                    return SequenceOutcome {
                        state: JobState::Cancelled,
                        passes,
                    };
                }
                PassExit::Code(code) => {
                    warn!("Encoder exited with code {} during {}", code, pass);
                    self.discard_after(pass);
                    return SequenceOutcome {
                        state: JobState::failed(
                            Some(code),
                            format!("encoder exited with code {} during {}", code, pass),
                            diagnostics,
                        ),
                        passes,
                    };
                }
            }
        }

        SequenceOutcome {
            state: JobState::Done,
            passes,
        }
    }

    /// Statistics are only kept between two successful passes
    fn discard_pass_logs(&self) {
        if self.clip.two_pass {
            remove_pass_logs(&self.clip.output);
        }
    }

    /// Cleanup after a pass that reached the runner. The runner already
    /// removes the logs once the second pass ends.
    fn discard_after(&self, pass: PassKind) {
        if pass != PassKind::Second {
            self.discard_pass_logs();
        }
    }
}
