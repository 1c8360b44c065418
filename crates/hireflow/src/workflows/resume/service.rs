use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::clock::Clock;
use super::domain::{
    ActionType, AuditEntry, Department, DepartmentId, DepartmentLevel, NewResume, Notification,
    NotificationId, PersonId, ResumeId, ResumeRecord, ResumeStatus, Role, Severity,
};
use super::notices::Notices;
use super::report::{DwellReport, OverdueSummary, Page, PipelineStats, TaskBucket};
use super::repository::{
    Directory, Mutation, NotificationSink, RepositoryError, ResumeFilter, ResumeRepository,
};
use super::sla::SlaPolicy;
use super::state_machine::{join_statuses, WorkflowAction};

const WORKLIST_PREVIEW: usize = 10;

/// State machine over résumé cases: validates, mutates, audits, and notifies in one commit.
pub struct ResumeWorkflowService<R, D, N> {
    repository: Arc<R>,
    directory: Arc<D>,
    sink: Arc<N>,
    clock: Arc<dyn Clock>,
    policy: SlaPolicy,
}

/// Outcome of one step before it is committed.
struct Transition {
    record: ResumeRecord,
    action: ActionType,
    comment: Option<String>,
    notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NotificationCounts {
    pub total: usize,
    pub unread: usize,
}

impl<R, D, N> ResumeWorkflowService<R, D, N>
where
    R: ResumeRepository + 'static,
    D: Directory + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(
        repository: Arc<R>,
        directory: Arc<D>,
        sink: Arc<N>,
        clock: Arc<dyn Clock>,
        policy: SlaPolicy,
    ) -> Self {
        Self {
            repository,
            directory,
            sink,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &SlaPolicy {
        &self.policy
    }

    /// Register an uploaded résumé in the HR pool.
    pub fn upload(
        &self,
        intake: NewResume,
        uploader: &PersonId,
    ) -> Result<ResumeRecord, WorkflowError> {
        if intake.candidate_name.trim().is_empty() {
            return Err(WorkflowError::ValidationFailed(
                "candidate name must not be blank".to_string(),
            ));
        }
        let person = self
            .directory
            .person(uploader)?
            .ok_or_else(|| WorkflowError::not_found("person", uploader))?;
        if !person.active {
            return Err(WorkflowError::Forbidden {
                operator: uploader.clone(),
                reason: "inactive accounts cannot upload".to_string(),
            });
        }

        let record = ResumeRecord::new(intake, uploader.clone(), self.clock.now());
        let entry = AuditEntry::upload(&record);
        let stored = self.repository.insert(record, entry)?;
        info!(resume_id = %stored.id, uploader = %uploader, "resume uploaded");
        Ok(stored)
    }

    /// `POOL_HR -> POOL_L2`: hand the item to a level-2 department's unclaimed pool.
    pub fn submit_for_l2(
        &self,
        id: &ResumeId,
        operator: &PersonId,
        l2_department: &DepartmentId,
    ) -> Result<ResumeRecord, WorkflowError> {
        self.transition(id, operator, WorkflowAction::SubmitForL2, |current, now| {
            let department = self.require_department(l2_department, DepartmentLevel::Level2)?;

            let mut next = current.clone();
            next.status = ResumeStatus::PoolL2;
            next.l2_department = Some(department.id.clone());
            next.current_handler = None;

            let notices = Notices::new(&*self.directory, &next, now);
            let managers = notices.l2_managers(&department.id)?;
            let notifications = notices.broadcast(
                &managers,
                Severity::Info,
                "New resume to route",
                &format!(
                    "Resume of {} was sent to {}; route it to a level-3 team.",
                    next.candidate_name, department.name
                ),
            )?;

            Ok(Transition {
                record: next,
                action: ActionType::DistributeL2,
                comment: None,
                notifications,
            })
        })
    }

    /// `POOL_L2 -> POOL_L3`: the routing manager holds the item until an expert is assigned.
    pub fn route_to_l3(
        &self,
        id: &ResumeId,
        operator: &PersonId,
        l3_department: &DepartmentId,
    ) -> Result<ResumeRecord, WorkflowError> {
        self.transition(id, operator, WorkflowAction::RouteToL3, |current, now| {
            let department = self.require_department(l3_department, DepartmentLevel::Level3)?;
            if let (Some(parent), Some(l2)) = (&department.parent, &current.l2_department) {
                if parent != l2 {
                    return Err(WorkflowError::ValidationFailed(format!(
                        "department {} does not belong to {l2}",
                        department.id
                    )));
                }
            }

            let mut next = current.clone();
            next.status = ResumeStatus::PoolL3;
            next.l3_department = Some(department.id.clone());
            next.current_handler = Some(operator.clone());

            let notices = Notices::new(&*self.directory, &next, now);
            let assistants = notices.members(&department.id, Role::L3Assistant)?;
            let notifications = notices.broadcast(
                &assistants,
                Severity::Info,
                "New resume awaiting expert assignment",
                &format!(
                    "Resume of {} was routed to {}; assign an expert.",
                    next.candidate_name, department.name
                ),
            )?;

            Ok(Transition {
                record: next,
                action: ActionType::DistributeL3,
                comment: None,
                notifications,
            })
        })
    }

    /// `POOL_L3 -> WAIT_IDENTIFY`: starts the identify SLA.
    pub fn assign_expert(
        &self,
        id: &ResumeId,
        operator: &PersonId,
        expert_id: &PersonId,
    ) -> Result<ResumeRecord, WorkflowError> {
        self.transition(id, operator, WorkflowAction::AssignExpert, |current, now| {
            let expert = self
                .directory
                .person(expert_id)?
                .ok_or_else(|| WorkflowError::not_found("person", expert_id))?;
            if expert.role != Role::Expert {
                return Err(WorkflowError::ValidationFailed(format!(
                    "{expert_id} is not an expert"
                )));
            }
            if !expert.active {
                return Err(WorkflowError::ValidationFailed(format!(
                    "expert {expert_id} is inactive"
                )));
            }

            let mut next = current.clone();
            next.status = ResumeStatus::WaitIdentify;
            next.expert = Some(expert.id.clone());
            next.current_handler = Some(expert.id.clone());
            next.sla_deadline = self.policy.deadline_for(next.status, now);
            next.is_overdue = false;

            let notices = Notices::new(&*self.directory, &next, now);
            let notification = notices.compose(
                &expert,
                Severity::Info,
                "New resume to identify",
                format!(
                    "Resume of {} was assigned to you; complete identification within {} hours.",
                    next.candidate_name,
                    self.policy.identify.num_hours()
                ),
            )?;

            Ok(Transition {
                record: next,
                action: ActionType::AssignExpert,
                comment: None,
                notifications: vec![notification],
            })
        })
    }

    /// `WAIT_IDENTIFY -> WAIT_CONTACT_INFO | REJECTED`; only the assigned expert may decide.
    pub fn record_identification(
        &self,
        id: &ResumeId,
        operator: &PersonId,
        identified: bool,
        comment: Option<String>,
    ) -> Result<ResumeRecord, WorkflowError> {
        self.transition(
            id,
            operator,
            WorkflowAction::RecordIdentification,
            |current, now| {
                if current.expert.as_ref() != Some(operator) {
                    return Err(WorkflowError::Forbidden {
                        operator: operator.clone(),
                        reason: "only the assigned expert may record identification".to_string(),
                    });
                }

                let mut next = current.clone();
                clear_sla(&mut next);
                next.current_handler = None;

                let (action, notifications) = if identified {
                    next.status = ResumeStatus::WaitContactInfo;
                    let notices = Notices::new(&*self.directory, &next, now);
                    let managers = match &next.l2_department {
                        Some(department) => notices.l2_managers(department)?,
                        None => Vec::new(),
                    };
                    let notifications = notices.broadcast(
                        &managers,
                        Severity::Warning,
                        "Contact details needed",
                        &format!(
                            "The expert identified {}; collect the candidate's contact details.",
                            next.candidate_name
                        ),
                    )?;
                    (ActionType::IdentifyYes, notifications)
                } else {
                    next.status = ResumeStatus::Rejected;
                    (ActionType::IdentifyNo, Vec::new())
                };

                Ok(Transition {
                    record: next,
                    action,
                    comment: non_blank(comment),
                    notifications,
                })
            },
        )
    }

    /// `WAIT_CONTACT_INFO -> WAIT_CONNECTION`: hands the item back to the expert.
    pub fn fill_contact_info(
        &self,
        id: &ResumeId,
        operator: &PersonId,
        email: Option<String>,
        phone: Option<String>,
    ) -> Result<ResumeRecord, WorkflowError> {
        let email = non_blank(email);
        let phone = non_blank(phone);

        self.transition(id, operator, WorkflowAction::FillContactInfo, |current, now| {
            if email.is_none() && phone.is_none() {
                return Err(WorkflowError::ValidationFailed(
                    "at least one of email or phone is required".to_string(),
                ));
            }

            let mut next = current.clone();
            next.email = email.clone();
            next.phone = phone.clone();
            next.status = ResumeStatus::WaitConnection;
            next.current_handler = next.expert.clone();
            next.sla_deadline = self.policy.deadline_for(next.status, now);
            next.is_overdue = false;

            let notices = Notices::new(&*self.directory, &next, now);
            let mut notifications = Vec::new();
            if let Some(expert) = next.expert.as_ref() {
                if let Some(expert) = notices.active_person(expert)? {
                    notifications.push(notices.compose(
                        &expert,
                        Severity::Warning,
                        "Contact the candidate",
                        format!(
                            "Contact details for {} are in; connect within {} hours.",
                            next.candidate_name,
                            self.policy.connection.num_hours()
                        ),
                    )?);
                }
            }

            Ok(Transition {
                record: next,
                action: ActionType::FillContact,
                comment: None,
                notifications,
            })
        })
    }

    /// `WAIT_CONNECTION -> WAIT_FEEDBACK`: starts the feedback SLA.
    pub fn start_connection(
        &self,
        id: &ResumeId,
        operator: &PersonId,
    ) -> Result<ResumeRecord, WorkflowError> {
        self.transition(id, operator, WorkflowAction::StartConnection, |current, now| {
            let mut next = current.clone();
            next.status = ResumeStatus::WaitFeedback;
            next.sla_deadline = self.policy.deadline_for(next.status, now);
            next.is_overdue = false;

            Ok(Transition {
                record: next,
                action: ActionType::ConnectStart,
                comment: None,
                notifications: Vec::new(),
            })
        })
    }

    /// `WAIT_FEEDBACK -> ARCHIVED`, or stay in `WAIT_FEEDBACK` without a deadline when
    /// `archive` is false. The feedback text lives only in the audit comment.
    pub fn submit_feedback(
        &self,
        id: &ResumeId,
        operator: &PersonId,
        feedback: String,
        archive: bool,
    ) -> Result<ResumeRecord, WorkflowError> {
        self.transition(id, operator, WorkflowAction::SubmitFeedback, |current, _now| {
            let feedback = non_blank(Some(feedback)).ok_or_else(|| {
                WorkflowError::ValidationFailed("feedback must not be blank".to_string())
            })?;

            let mut next = current.clone();
            clear_sla(&mut next);
            if archive {
                next.status = ResumeStatus::Archived;
                next.current_handler = None;
            }

            Ok(Transition {
                record: next,
                action: ActionType::Feedback,
                comment: Some(feedback),
                notifications: Vec::new(),
            })
        })
    }

    /// Release from connection or feedback straight back into the level-2 pool. `RELEASED`
    /// is folded into the single audit entry and never persisted.
    pub fn release(
        &self,
        id: &ResumeId,
        operator: &PersonId,
        reason: Option<String>,
    ) -> Result<ResumeRecord, WorkflowError> {
        self.transition(id, operator, WorkflowAction::Release, |current, now| {
            let mut next = current.clone();
            next.status = ResumeStatus::PoolL2;
            next.expert = None;
            next.l3_department = None;
            next.current_handler = None;
            clear_sla(&mut next);

            let notices = Notices::new(&*self.directory, &next, now);
            let managers = match &next.l2_department {
                Some(department) => notices.l2_managers(department)?,
                None => Vec::new(),
            };
            let notifications = notices.broadcast(
                &managers,
                Severity::Info,
                "Resume returned to pool",
                &format!(
                    "Resume of {} was released and is waiting to be routed again.",
                    next.candidate_name
                ),
            )?;

            Ok(Transition {
                record: next,
                action: ActionType::ReleasedAndRequeued,
                comment: non_blank(reason),
                notifications,
            })
        })
    }

    /// Explain an overdue item. Status is unchanged; repeated calls overwrite the reason.
    pub fn submit_overdue_reason(
        &self,
        id: &ResumeId,
        operator: &PersonId,
        reason: String,
    ) -> Result<ResumeRecord, WorkflowError> {
        self.apply(id, operator, None, |current, _now| {
            if !current.is_overdue {
                return Err(WorkflowError::PreconditionFailed {
                    reason: format!("resume {} is not overdue", current.id),
                    current: current.status,
                });
            }
            let reason = non_blank(Some(reason)).ok_or_else(|| {
                WorkflowError::ValidationFailed("overdue reason must not be blank".to_string())
            })?;

            let mut next = current.clone();
            next.overdue_reason = Some(reason.clone());

            Ok(Transition {
                record: next,
                action: ActionType::OverdueReason,
                comment: Some(reason),
                notifications: Vec::new(),
            })
        })
    }

    pub fn get(&self, id: &ResumeId) -> Result<ResumeRecord, WorkflowError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| WorkflowError::not_found("resume", id))
    }

    pub fn list(&self, filter: &ResumeFilter) -> Result<Vec<ResumeRecord>, WorkflowError> {
        Ok(self.repository.query(filter)?)
    }

    /// Paged listing, newest first. `page` is 1-based; `page_size` must be 1..=100.
    pub fn list_page(
        &self,
        filter: &ResumeFilter,
        page: usize,
        page_size: usize,
    ) -> Result<Page<ResumeRecord>, WorkflowError> {
        if page == 0 {
            return Err(WorkflowError::ValidationFailed(
                "page must be at least 1".to_string(),
            ));
        }
        if page_size == 0 || page_size > Page::<ResumeRecord>::MAX_SIZE {
            return Err(WorkflowError::ValidationFailed(format!(
                "page_size must be between 1 and {}",
                Page::<ResumeRecord>::MAX_SIZE
            )));
        }
        Ok(Page::slice(self.list(filter)?, page, page_size))
    }

    /// Audit trail of one item, newest first.
    pub fn audit_log(&self, id: &ResumeId) -> Result<Vec<AuditEntry>, WorkflowError> {
        self.get(id)?;
        Ok(self.repository.audit_log(id)?)
    }

    /// Actions an operator could take next, from the same tables used for validation.
    pub fn available_actions(&self, id: &ResumeId) -> Result<Vec<WorkflowAction>, WorkflowError> {
        let record = self.get(id)?;
        Ok(available_actions(&record))
    }

    /// Per-role task buckets for the person's inbox.
    pub fn worklist(&self, person_id: &PersonId) -> Result<Vec<TaskBucket>, WorkflowError> {
        let person = self
            .directory
            .person(person_id)?
            .ok_or_else(|| WorkflowError::not_found("person", person_id))?;

        let scoped = |status: Option<ResumeStatus>, overdue: Option<bool>| {
            let mut filter = ResumeFilter {
                statuses: status.map(|status| vec![status]),
                is_overdue: overdue,
                ..ResumeFilter::default()
            };
            match person.role {
                Role::L2Manager => filter.l2_department = person.department.clone(),
                Role::L3Assistant => filter.l3_department = person.department.clone(),
                Role::Expert => filter.expert = Some(person.id.clone()),
                Role::Hr | Role::Admin => {}
            }
            filter
        };

        let plan: Vec<(&'static str, ResumeFilter, bool)> = match person.role {
            Role::Hr => vec![(
                "awaiting_l2_routing",
                scoped(Some(ResumeStatus::PoolHr), None),
                true,
            )],
            Role::L2Manager => vec![
                (
                    "awaiting_l3_routing",
                    scoped(Some(ResumeStatus::PoolL2), None),
                    true,
                ),
                (
                    "awaiting_contact_info",
                    scoped(Some(ResumeStatus::WaitContactInfo), None),
                    true,
                ),
                ("overdue", scoped(None, Some(true)), true),
            ],
            Role::L3Assistant => vec![(
                "awaiting_expert",
                scoped(Some(ResumeStatus::PoolL3), None),
                true,
            )],
            Role::Expert => vec![
                (
                    "awaiting_identification",
                    scoped(Some(ResumeStatus::WaitIdentify), None),
                    false,
                ),
                (
                    "awaiting_connection",
                    scoped(Some(ResumeStatus::WaitConnection), None),
                    false,
                ),
                (
                    "awaiting_feedback",
                    scoped(Some(ResumeStatus::WaitFeedback), None),
                    false,
                ),
            ],
            Role::Admin => Vec::new(),
        };

        plan.into_iter()
            .map(|(kind, filter, preview)| -> Result<TaskBucket, WorkflowError> {
                let mut items = self.repository.query(&filter)?;
                let count = items.len();
                if preview {
                    items.truncate(WORKLIST_PREVIEW);
                }
                Ok(TaskBucket { kind, count, items })
            })
            .collect()
    }

    pub fn stats(&self) -> Result<PipelineStats, WorkflowError> {
        let records = self.repository.query(&ResumeFilter::default())?;
        Ok(PipelineStats::from_records(&records))
    }

    pub fn overdue_summary(&self) -> Result<OverdueSummary, WorkflowError> {
        let overdue = self.repository.query(&ResumeFilter {
            is_overdue: Some(true),
            ..ResumeFilter::default()
        })?;
        Ok(OverdueSummary::from_records(&overdue))
    }

    pub fn dwell_report(&self) -> Result<DwellReport, WorkflowError> {
        let entries = self.repository.audit_entries()?;
        Ok(DwellReport::from_entries(&entries))
    }

    pub fn notifications(
        &self,
        recipient: &PersonId,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Notification>, WorkflowError> {
        Ok(self
            .repository
            .notifications_for(recipient, unread_only, limit)?)
    }

    pub fn notification_counts(
        &self,
        recipient: &PersonId,
    ) -> Result<NotificationCounts, WorkflowError> {
        let all = self
            .repository
            .notifications_for(recipient, false, usize::MAX)?;
        let unread = all.iter().filter(|note| !note.is_read).count();
        Ok(NotificationCounts {
            total: all.len(),
            unread,
        })
    }

    pub fn mark_read(
        &self,
        recipient: &PersonId,
        id: &NotificationId,
    ) -> Result<(), WorkflowError> {
        self.repository
            .mark_read(recipient, id)
            .map_err(|err| notification_error(err, id))
    }

    pub fn mark_all_read(&self, recipient: &PersonId) -> Result<usize, WorkflowError> {
        Ok(self.repository.mark_all_read(recipient)?)
    }

    pub fn delete_notification(
        &self,
        recipient: &PersonId,
        id: &NotificationId,
    ) -> Result<(), WorkflowError> {
        self.repository
            .delete_notification(recipient, id)
            .map_err(|err| notification_error(err, id))
    }

    fn transition<F>(
        &self,
        id: &ResumeId,
        operator: &PersonId,
        action: WorkflowAction,
        step: F,
    ) -> Result<ResumeRecord, WorkflowError>
    where
        F: FnOnce(&ResumeRecord, DateTime<Utc>) -> Result<Transition, WorkflowError>,
    {
        self.apply(id, operator, Some(action), step)
    }

    /// Load, check, mutate, and commit against the version that was read.
    fn apply<F>(
        &self,
        id: &ResumeId,
        operator: &PersonId,
        guard: Option<WorkflowAction>,
        step: F,
    ) -> Result<ResumeRecord, WorkflowError>
    where
        F: FnOnce(&ResumeRecord, DateTime<Utc>) -> Result<Transition, WorkflowError>,
    {
        let current = self.get(id)?;
        if let Some(action) = guard {
            if !action.accepts(current.status) {
                return Err(WorkflowError::InvalidTransition {
                    action,
                    current: current.status,
                    expected: action.sources(),
                });
            }
        }

        let now = self.clock.now();
        let Transition {
            mut record,
            action,
            comment,
            notifications,
        } = step(&current, now)?;
        record.updated_at = Some(now);
        debug_assert!(record.sla_consistent(), "{action} broke the SLA invariant");

        let entry = AuditEntry::transition(
            &current,
            &record,
            Some(operator.clone()),
            action,
            comment,
            now,
        );
        let stored = self.repository.commit(
            current.version,
            Mutation {
                record,
                entry,
                notifications: notifications.clone(),
            },
        )?;

        info!(
            resume_id = %stored.id,
            operator = %operator,
            action = %action,
            from = %current.status,
            to = %stored.status,
            "workflow transition committed"
        );
        deliver(&*self.sink, &notifications);
        Ok(stored)
    }

    fn require_department(
        &self,
        id: &DepartmentId,
        level: DepartmentLevel,
    ) -> Result<Department, WorkflowError> {
        let department = self
            .directory
            .department(id)?
            .ok_or_else(|| WorkflowError::not_found("department", id))?;
        if department.level != level {
            return Err(WorkflowError::ValidationFailed(format!(
                "department {id} is not a {} department",
                match level {
                    DepartmentLevel::Level2 => "level-2",
                    DepartmentLevel::Level3 => "level-3",
                }
            )));
        }
        Ok(department)
    }
}

/// Legal next actions for a record; overdue reasons only while overdue.
pub fn available_actions(record: &ResumeRecord) -> Vec<WorkflowAction> {
    WorkflowAction::available_for(record.status)
        .into_iter()
        .filter(|action| *action != WorkflowAction::SubmitOverdueReason || record.is_overdue)
        .collect()
}

/// Hand committed notifications to the sink; delivery failures do not undo the commit.
pub(crate) fn deliver<N: NotificationSink + ?Sized>(sink: &N, notifications: &[Notification]) {
    for notification in notifications {
        if let Err(err) = sink.enqueue(notification) {
            warn!(
                notification_id = %notification.id,
                recipient = %notification.recipient,
                error = %err,
                "notification delivery failed"
            );
        }
    }
}

fn clear_sla(record: &mut ResumeRecord) {
    record.sla_deadline = None;
    record.is_overdue = false;
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn notification_error(err: RepositoryError, id: &NotificationId) -> WorkflowError {
    match err {
        RepositoryError::NotFound => WorkflowError::not_found("notification", id),
        other => other.into(),
    }
}

/// Error raised by workflow operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("cannot {action} while resume is {current}; expected {}", join_statuses(.expected))]
    InvalidTransition {
        action: WorkflowAction,
        current: ResumeStatus,
        expected: &'static [ResumeStatus],
    },
    #[error("operator {operator} is not permitted: {reason}")]
    Forbidden { operator: PersonId, reason: String },
    #[error("validation failed: {0}")]
    ValidationFailed(String),
    #[error("precondition failed: {reason}")]
    PreconditionFailed {
        reason: String,
        current: ResumeStatus,
    },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("resume was modified concurrently; reload and retry")]
    Conflict,
    #[error(transparent)]
    Store(RepositoryError),
}

impl WorkflowError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable tag for client payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Forbidden { .. } => "forbidden",
            Self::ValidationFailed(_) => "validation_failed",
            Self::PreconditionFailed { .. } => "precondition_failed",
            Self::NotFound { .. } | Self::Store(RepositoryError::NotFound) => "not_found",
            Self::Conflict | Self::Store(RepositoryError::Conflict) => "conflict",
            Self::Store(RepositoryError::Unavailable(_)) => "store_unavailable",
        }
    }

    pub fn current_status(&self) -> Option<ResumeStatus> {
        match self {
            Self::InvalidTransition { current, .. } | Self::PreconditionFailed { current, .. } => {
                Some(*current)
            }
            _ => None,
        }
    }
}

impl From<RepositoryError> for WorkflowError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict => Self::Conflict,
            other => Self::Store(other),
        }
    }
}
