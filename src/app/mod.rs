// Application layer - Job management and orchestration

pub mod job;
pub mod orchestrator;

pub use job::{Job, JobId, JobSnapshot};
pub use orchestrator::{JobOrchestrator, JobSelection};
