use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier wrapper for résumé cases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResumeId(pub String);

impl ResumeId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ResumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for directory people.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub String);

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for departments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepartmentId(pub String);

impl fmt::Display for DepartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub String);

impl NotificationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pipeline status of a résumé case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResumeStatus {
    PoolHr,
    PoolL2,
    PoolL3,
    WaitIdentify,
    WaitContactInfo,
    WaitConnection,
    WaitFeedback,
    Archived,
    Released,
    Rejected,
}

impl ResumeStatus {
    pub const fn ordered() -> [Self; 10] {
        [
            Self::PoolHr,
            Self::PoolL2,
            Self::PoolL3,
            Self::WaitIdentify,
            Self::WaitContactInfo,
            Self::WaitConnection,
            Self::WaitFeedback,
            Self::Archived,
            Self::Released,
            Self::Rejected,
        ]
    }

    /// Waiting states that carry a deadline.
    pub const SLA_BEARING: [Self; 3] = [Self::WaitIdentify, Self::WaitConnection, Self::WaitFeedback];

    pub const fn code(self) -> &'static str {
        match self {
            Self::PoolHr => "POOL_HR",
            Self::PoolL2 => "POOL_L2",
            Self::PoolL3 => "POOL_L3",
            Self::WaitIdentify => "WAIT_IDENTIFY",
            Self::WaitContactInfo => "WAIT_CONTACT_INFO",
            Self::WaitConnection => "WAIT_CONNECTION",
            Self::WaitFeedback => "WAIT_FEEDBACK",
            Self::Archived => "ARCHIVED",
            Self::Released => "RELEASED",
            Self::Rejected => "REJECTED",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::PoolHr => "Awaiting HR routing",
            Self::PoolL2 => "Awaiting level-2 routing",
            Self::PoolL3 => "Awaiting expert assignment",
            Self::WaitIdentify => "Awaiting identification",
            Self::WaitContactInfo => "Awaiting contact details",
            Self::WaitConnection => "Awaiting connection",
            Self::WaitFeedback => "Awaiting feedback",
            Self::Archived => "Archived",
            Self::Released => "Released",
            Self::Rejected => "Not identified",
        }
    }

    pub const fn is_sla_bearing(self) -> bool {
        matches!(
            self,
            Self::WaitIdentify | Self::WaitConnection | Self::WaitFeedback
        )
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Archived | Self::Rejected)
    }
}

impl fmt::Display for ResumeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Fixed set of directory roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Hr,
    L2Manager,
    L3Assistant,
    Expert,
    Admin,
}

impl Role {
    /// Roles that only make sense with a department affiliation.
    pub const fn is_department_scoped(self) -> bool {
        matches!(self, Self::L2Manager | Self::L3Assistant | Self::Expert)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepartmentLevel {
    #[serde(rename = "2")]
    Level2,
    #[serde(rename = "3")]
    Level3,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub level: DepartmentLevel,
    pub parent: Option<DepartmentId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub role: Role,
    pub department: Option<DepartmentId>,
    pub active: bool,
}

impl Person {
    pub fn belongs_to(&self, department: &DepartmentId) -> bool {
        self.department.as_ref() == Some(department)
    }
}

/// Intake payload for a freshly uploaded résumé.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewResume {
    pub candidate_name: String,
    pub source: String,
    #[serde(default)]
    pub document_ref: Option<String>,
}

/// Persisted résumé case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub id: ResumeId,
    pub candidate_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: String,
    /// Opaque key into the document store.
    pub document_ref: Option<String>,
    pub status: ResumeStatus,
    pub l2_department: Option<DepartmentId>,
    pub l3_department: Option<DepartmentId>,
    pub uploader: PersonId,
    pub current_handler: Option<PersonId>,
    pub expert: Option<PersonId>,
    pub sla_deadline: Option<DateTime<Utc>>,
    pub is_overdue: bool,
    pub overdue_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency token, bumped by the store on every commit.
    pub version: u64,
}

impl ResumeRecord {
    pub fn new(intake: NewResume, uploader: PersonId, now: DateTime<Utc>) -> Self {
        Self {
            id: ResumeId::generate(),
            candidate_name: intake.candidate_name.trim().to_string(),
            email: None,
            phone: None,
            source: intake.source,
            document_ref: intake.document_ref,
            status: ResumeStatus::PoolHr,
            l2_department: None,
            l3_department: None,
            uploader,
            current_handler: None,
            expert: None,
            sla_deadline: None,
            is_overdue: false,
            overdue_reason: None,
            created_at: now,
            updated_at: None,
            version: 0,
        }
    }

    /// Seconds spent in the current status as of `now`.
    pub fn dwell_seconds(&self, now: DateTime<Utc>) -> i64 {
        let since = self.updated_at.unwrap_or(self.created_at);
        (now - since).num_seconds().max(0)
    }

    /// Deadline presence and overdue flag agree with the status. `WAIT_FEEDBACK` may run
    /// untimed once feedback was recorded without archiving.
    pub fn sla_consistent(&self) -> bool {
        let bearing = self.status.is_sla_bearing();
        let untimed_feedback =
            self.status == ResumeStatus::WaitFeedback && self.sla_deadline.is_none();
        let deadline_matches = self.sla_deadline.is_some() == bearing || untimed_feedback;
        deadline_matches && (!self.is_overdue || self.sla_deadline.is_some())
    }

    pub fn link(&self) -> String {
        format!("/resumes/{}", self.id)
    }
}

/// Audit action tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Upload,
    DistributeL2,
    DistributeL3,
    AssignExpert,
    IdentifyYes,
    IdentifyNo,
    FillContact,
    ConnectStart,
    Feedback,
    ReleasedAndRequeued,
    OverdueReason,
    OverdueFlagged,
}

impl ActionType {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Upload => "UPLOAD",
            Self::DistributeL2 => "DISTRIBUTE_L2",
            Self::DistributeL3 => "DISTRIBUTE_L3",
            Self::AssignExpert => "ASSIGN_EXPERT",
            Self::IdentifyYes => "IDENTIFY_YES",
            Self::IdentifyNo => "IDENTIFY_NO",
            Self::FillContact => "FILL_CONTACT",
            Self::ConnectStart => "CONNECT_START",
            Self::Feedback => "FEEDBACK",
            Self::ReleasedAndRequeued => "RELEASED_AND_REQUEUED",
            Self::OverdueReason => "OVERDUE_REASON",
            Self::OverdueFlagged => "OVERDUE_FLAGGED",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Immutable record of one transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub resume_id: ResumeId,
    /// `None` when the SLA monitor acted.
    pub operator: Option<PersonId>,
    pub action: ActionType,
    pub previous_status: Option<ResumeStatus>,
    pub new_status: ResumeStatus,
    pub comment: Option<String>,
    pub dwell_seconds: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Entry for a transition from `before` into `after`, measuring dwell against `before`.
    pub fn transition(
        before: &ResumeRecord,
        after: &ResumeRecord,
        operator: Option<PersonId>,
        action: ActionType,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            resume_id: before.id.clone(),
            operator,
            action,
            previous_status: Some(before.status),
            new_status: after.status,
            comment,
            dwell_seconds: Some(before.dwell_seconds(now)),
            created_at: now,
        }
    }

    pub fn upload(record: &ResumeRecord) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            resume_id: record.id.clone(),
            operator: Some(record.uploader.clone()),
            action: ActionType::Upload,
            previous_status: None,
            new_status: record.status,
            comment: None,
            dwell_seconds: None,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Urgent,
}

/// Message addressed to one person; carries enough context to be read without the link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: PersonId,
    pub resume_id: Option<ResumeId>,
    pub title: String,
    pub body: String,
    pub severity: Severity,
    pub current_handler: Option<String>,
    pub current_stage: Option<String>,
    pub overdue_for: Option<String>,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record() -> ResumeRecord {
        let now = Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap();
        ResumeRecord::new(
            NewResume {
                candidate_name: "  Ada Lovelace ".to_string(),
                source: "referral".to_string(),
                document_ref: None,
            },
            PersonId("hr-1".to_string()),
            now,
        )
    }

    #[test]
    fn new_records_start_in_hr_pool_without_deadline() {
        let record = record();
        assert_eq!(record.status, ResumeStatus::PoolHr);
        assert_eq!(record.candidate_name, "Ada Lovelace");
        assert!(record.current_handler.is_none());
        assert!(record.sla_consistent());
    }

    #[test]
    fn dwell_falls_back_to_creation_time() {
        let mut record = record();
        let later = record.created_at + Duration::minutes(90);
        assert_eq!(record.dwell_seconds(later), 5400);

        record.updated_at = Some(record.created_at + Duration::hours(1));
        assert_eq!(record.dwell_seconds(later), 1800);
    }

    #[test]
    fn sla_consistency_rejects_deadline_outside_waiting_states() {
        let mut record = record();
        record.sla_deadline = Some(record.created_at);
        assert!(!record.sla_consistent());

        record.status = ResumeStatus::WaitIdentify;
        assert!(record.sla_consistent());

        record.status = ResumeStatus::Archived;
        record.sla_deadline = None;
        record.is_overdue = true;
        assert!(!record.sla_consistent());
    }

    #[test]
    fn feedback_stage_may_run_without_deadline() {
        let mut record = record();
        record.status = ResumeStatus::WaitFeedback;
        assert!(record.sla_consistent());

        record.is_overdue = true;
        assert!(!record.sla_consistent());

        record.status = ResumeStatus::WaitConnection;
        record.is_overdue = false;
        assert!(!record.sla_consistent());
    }

    #[test]
    fn status_serializes_with_wire_codes() {
        let json = serde_json::to_string(&ResumeStatus::WaitContactInfo).unwrap();
        assert_eq!(json, "\"WAIT_CONTACT_INFO\"");
        for status in ResumeStatus::ordered() {
            let encoded = serde_json::to_value(status).unwrap();
            assert_eq!(encoded, serde_json::Value::String(status.code().to_string()));
        }
    }
}
