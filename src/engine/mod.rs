//! Core encoding engine module
//!
//! Argument construction, encoder process supervision and pass sequencing.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod cancel;
pub mod clipper;
pub mod command;
pub mod process;
pub mod progress;

pub use cancel::CancelHandle;
pub use clipper::{JobState, PassSequencer};
pub use command::{ArgumentBuilder, EncoderCommand};
pub use process::ProcessSupervisor;
pub use progress::{ProgressParser, ProgressSample};

/// Which invocation of the encoder a command belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    /// Single-pass encode
    Single,
    /// Statistics-gathering first pass of two
    First,
    /// Second pass of two, consumes the first pass log
    Second,
}

impl PassKind {
    /// Passes a clip needs, in execution order
    pub fn sequence(two_pass: bool) -> &'static [PassKind] {
        if two_pass {
            &[PassKind::First, PassKind::Second]
        } else {
            &[PassKind::Single]
        }
    }

    /// 1-based pass number
    pub fn number(self) -> u8 {
        match self {
            PassKind::Single | PassKind::First => 1,
            PassKind::Second => 2,
        }
    }

    pub fn is_two_pass(self) -> bool {
        !matches!(self, PassKind::Single)
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassKind::Single => write!(f, "single pass"),
            PassKind::First => write!(f, "pass 1/2"),
            PassKind::Second => write!(f, "pass 2/2"),
        }
    }
}

/// How an encoder invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassExit {
    /// Process exited; `-1` when terminated by a signal
    Code(i32),
    /// Stopped by a cancellation request
    Cancelled,
}

impl PassExit {
    pub fn is_success(self) -> bool {
        self == PassExit::Code(0)
    }
}

/// Outcome of one encoder invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassResult {
    pub pass: PassKind,
    pub exit: PassExit,
    /// Last progress sample seen during the pass
    pub last_sample: Option<ProgressSample>,
    pub elapsed: Duration,
    /// Tail of the captured diagnostic output
    pub diagnostics: Vec<String>,
}

/// Notification published while a job runs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EncoderEvent {
    /// A pass is about to launch the encoder
    PassStarted { pass: PassKind, command: String },
    /// One captured line from either output stream
    Output { line: String },
    Progress { sample: ProgressSample },
    PassFinished { pass: PassKind, exit: PassExit },
    /// The job reached a new state
    State { state: JobState },
}
