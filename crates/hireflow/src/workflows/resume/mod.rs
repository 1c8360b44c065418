//! Résumé hiring pipeline: workflow state machine, SLA monitor, and audit trail.

mod clock;
pub mod domain;
mod memory;
mod monitor;
mod notices;
pub mod report;
mod repository;
mod router;
mod scheduler;
mod service;
mod sla;
mod state_machine;

pub use clock::{Clock, ManualClock, SystemClock};
pub use memory::{DirectoryError, MemoryDirectory, MemoryNotificationSink, MemoryResumeStore};
pub use monitor::{SlaMonitor, SweepError, SweepReport};
pub use repository::{
    DeadlineWindow, Directory, Mutation, NotificationSink, RepositoryError, ResumeFilter,
    ResumeRepository, SinkError,
};
pub use router::{resume_router, ResumeApi, ResumeView, OPERATOR_HEADER};
pub(crate) use router::{sweep_error_response, workflow_error_response};
pub use scheduler::{spawn_sla_monitor, SlaMonitorHandle};
pub use service::{available_actions, NotificationCounts, ResumeWorkflowService, WorkflowError};
pub use sla::{format_overdue, format_remaining, SlaMonitorConfig, SlaPolicy};
pub use state_machine::WorkflowAction;

#[cfg(test)]
mod tests;
