//! Transition table for the résumé pipeline.
//!
//! `ResumeStatus::allowed_next` is the only place legal status edges are written down. Every
//! operator action declares the sources it accepts and the targets it may produce; the unit
//! tests pin each declared edge to the table, so the action catalogue can be used for both
//! validation and "what can I do next" queries without drifting.

use serde::Serialize;
use std::fmt;

use super::domain::ResumeStatus;

impl ResumeStatus {
    /// Statuses reachable in one step.
    pub const fn allowed_next(self) -> &'static [ResumeStatus] {
        use ResumeStatus::*;
        match self {
            PoolHr => &[PoolL2],
            PoolL2 => &[PoolL3],
            PoolL3 => &[WaitIdentify],
            WaitIdentify => &[WaitContactInfo, Rejected],
            WaitContactInfo => &[WaitConnection],
            WaitConnection => &[WaitFeedback, Released],
            WaitFeedback => &[Archived, Released],
            Released => &[PoolL2],
            Archived | Rejected => &[],
        }
    }

    pub fn can_transition_to(self, next: ResumeStatus) -> bool {
        self.allowed_next().contains(&next)
    }
}

/// Operations the workflow service exposes to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    SubmitForL2,
    RouteToL3,
    AssignExpert,
    RecordIdentification,
    FillContactInfo,
    StartConnection,
    SubmitFeedback,
    Release,
    SubmitOverdueReason,
}

impl WorkflowAction {
    pub const ALL: [Self; 9] = [
        Self::SubmitForL2,
        Self::RouteToL3,
        Self::AssignExpert,
        Self::RecordIdentification,
        Self::FillContactInfo,
        Self::StartConnection,
        Self::SubmitFeedback,
        Self::Release,
        Self::SubmitOverdueReason,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::SubmitForL2 => "submit_for_l2",
            Self::RouteToL3 => "route_to_l3",
            Self::AssignExpert => "assign_expert",
            Self::RecordIdentification => "record_identification",
            Self::FillContactInfo => "fill_contact_info",
            Self::StartConnection => "start_connection",
            Self::SubmitFeedback => "submit_feedback",
            Self::Release => "release",
            Self::SubmitOverdueReason => "submit_overdue_reason",
        }
    }

    /// Statuses the action may start from. Overdue reasons are gated on the overdue flag,
    /// which can only be set while an item waits on an SLA.
    pub const fn sources(self) -> &'static [ResumeStatus] {
        use ResumeStatus::*;
        match self {
            Self::SubmitForL2 => &[PoolHr],
            Self::RouteToL3 => &[PoolL2],
            Self::AssignExpert => &[PoolL3],
            Self::RecordIdentification => &[WaitIdentify],
            Self::FillContactInfo => &[WaitContactInfo],
            Self::StartConnection => &[WaitConnection],
            Self::SubmitFeedback => &[WaitFeedback],
            Self::Release => &[WaitConnection, WaitFeedback],
            Self::SubmitOverdueReason => &ResumeStatus::SLA_BEARING,
        }
    }

    /// Statuses the action may leave the item in. `Release` passes through `RELEASED` and
    /// persists the re-entry target; feedback without archiving keeps the item where it is.
    pub const fn targets(self) -> &'static [ResumeStatus] {
        use ResumeStatus::*;
        match self {
            Self::SubmitForL2 => &[PoolL2],
            Self::RouteToL3 => &[PoolL3],
            Self::AssignExpert => &[WaitIdentify],
            Self::RecordIdentification => &[WaitContactInfo, Rejected],
            Self::FillContactInfo => &[WaitConnection],
            Self::StartConnection => &[WaitFeedback],
            Self::SubmitFeedback => &[Archived, WaitFeedback],
            Self::Release => &[PoolL2],
            Self::SubmitOverdueReason => &[],
        }
    }

    pub fn accepts(self, status: ResumeStatus) -> bool {
        self.sources().contains(&status)
    }

    /// Actions whose source set contains `status`.
    pub fn available_for(status: ResumeStatus) -> Vec<WorkflowAction> {
        Self::ALL
            .into_iter()
            .filter(|action| action.accepts(status))
            .collect()
    }
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn join_statuses(statuses: &[ResumeStatus]) -> String {
    statuses
        .iter()
        .map(|status| status.code())
        .collect::<Vec<_>>()
        .join(" | ")
}
