use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    AuditEntry, Department, DepartmentId, Notification, NotificationId, Person, PersonId,
    ResumeId, ResumeRecord, ResumeStatus, Role,
};

/// One atomic unit: the new item state, its audit entry, and the notifications it raised.
#[derive(Debug, Clone)]
pub struct Mutation {
    pub record: ResumeRecord,
    pub entry: AuditEntry,
    pub notifications: Vec<Notification>,
}

/// Deadline predicate used by the SLA scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineWindow {
    /// Strictly before the instant.
    Before(DateTime<Utc>),
    /// Strictly after `after`, at or before `until`.
    Between {
        after: DateTime<Utc>,
        until: DateTime<Utc>,
    },
}

/// Query filter; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeFilter {
    #[serde(default)]
    pub statuses: Option<Vec<ResumeStatus>>,
    #[serde(default)]
    pub l2_department: Option<DepartmentId>,
    #[serde(default)]
    pub l3_department: Option<DepartmentId>,
    #[serde(default)]
    pub expert: Option<PersonId>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub is_overdue: Option<bool>,
    #[serde(skip)]
    pub deadline: Option<DeadlineWindow>,
}

impl ResumeFilter {
    pub fn matches(&self, record: &ResumeRecord) -> bool {
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&record.status) {
                return false;
            }
        }
        if self.l2_department.is_some() && self.l2_department != record.l2_department {
            return false;
        }
        if self.l3_department.is_some() && self.l3_department != record.l3_department {
            return false;
        }
        if self.expert.is_some() && self.expert != record.expert {
            return false;
        }
        if let Some(source) = &self.source {
            if source != &record.source {
                return false;
            }
        }
        if let Some(flag) = self.is_overdue {
            if flag != record.is_overdue {
                return false;
            }
        }
        match (self.deadline, record.sla_deadline) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(DeadlineWindow::Before(instant)), Some(deadline)) => deadline < instant,
            (Some(DeadlineWindow::Between { after, until }), Some(deadline)) => {
                deadline > after && deadline <= until
            }
        }
    }
}

/// Transactional record store for résumés, their audit trail, and notifications.
pub trait ResumeRepository: Send + Sync {
    /// Persist a new item together with its creation entry.
    fn insert(&self, record: ResumeRecord, entry: AuditEntry)
        -> Result<ResumeRecord, RepositoryError>;
    fn fetch(&self, id: &ResumeId) -> Result<Option<ResumeRecord>, RepositoryError>;
    /// Apply `mutation` only if the stored version still equals `expected_version`; the item,
    /// entry, and notifications land together or not at all. Returns the stored record.
    fn commit(
        &self,
        expected_version: u64,
        mutation: Mutation,
    ) -> Result<ResumeRecord, RepositoryError>;
    /// Matching items, newest created first.
    fn query(&self, filter: &ResumeFilter) -> Result<Vec<ResumeRecord>, RepositoryError>;
    /// Entries for one item, newest first.
    fn audit_log(&self, id: &ResumeId) -> Result<Vec<AuditEntry>, RepositoryError>;
    fn audit_entries(&self) -> Result<Vec<AuditEntry>, RepositoryError>;
    /// Store notifications that are not tied to an item mutation.
    fn append_notifications(&self, notifications: Vec<Notification>)
        -> Result<(), RepositoryError>;
    /// Inbox listing, newest first.
    fn notifications_for(
        &self,
        recipient: &PersonId,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Notification>, RepositoryError>;
    fn mark_read(&self, recipient: &PersonId, id: &NotificationId)
        -> Result<(), RepositoryError>;
    fn mark_all_read(&self, recipient: &PersonId) -> Result<usize, RepositoryError>;
    fn delete_notification(
        &self,
        recipient: &PersonId,
        id: &NotificationId,
    ) -> Result<(), RepositoryError>;
}

/// People and departments.
pub trait Directory: Send + Sync {
    fn person(&self, id: &PersonId) -> Result<Option<Person>, RepositoryError>;
    fn department(&self, id: &DepartmentId) -> Result<Option<Department>, RepositoryError>;
    /// Active people of `role` affiliated with `department`.
    fn active_members(
        &self,
        department: &DepartmentId,
        role: Role,
    ) -> Result<Vec<Person>, RepositoryError>;
}

/// Outbound delivery hook (push, e-mail, chat); queuing semantics are the sink's concern.
pub trait NotificationSink: Send + Sync {
    fn enqueue(&self, notification: &Notification) -> Result<(), SinkError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record was modified concurrently")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
