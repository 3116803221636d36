// Ports - Interface definitions (contracts)

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::engine::{CancelHandle, EncoderCommand, EncoderEvent, PassResult};
use crate::error::EncodeResult;

/// Port for running a single encoder pass
#[async_trait]
pub trait PassRunner: Send + Sync {
    /// Run `command` until it exits or `cancel` fires, publishing output and
    /// progress on `events`. Cancellation is reported through the result's
    /// exit, not as an error. After a second pass the runner removes the
    /// pass logs, whatever the outcome.
    async fn run_pass(
        &self,
        command: &EncoderCommand,
        cancel: &CancelHandle,
        events: &broadcast::Sender<EncoderEvent>,
    ) -> EncodeResult<PassResult>;
}
