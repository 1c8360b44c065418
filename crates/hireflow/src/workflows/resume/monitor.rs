//! Periodic SLA sweep: flags breached items and reminds handlers of imminent deadlines.
//!
//! Every candidate is re-read and re-checked before it is flagged, and the flag is committed
//! against the version that was read. An item an operator moved in the meantime is skipped
//! instead of being flagged in a status it already left.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::clock::Clock;
use super::domain::{ActionType, AuditEntry, ResumeId, ResumeRecord, ResumeStatus, Severity};
use super::notices::Notices;
use super::repository::{
    DeadlineWindow, Directory, Mutation, NotificationSink, RepositoryError, ResumeFilter,
    ResumeRepository,
};
use super::service::deliver;
use super::sla::{format_overdue, format_remaining, SlaMonitorConfig};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    /// Items flagged overdue by this sweep.
    pub overdue: Vec<ResumeRecord>,
    /// Items whose deadline falls inside the lookahead window.
    pub imminent: Vec<ResumeRecord>,
    /// Candidates that changed underneath the sweep and were left alone.
    pub skipped: Vec<ResumeId>,
    pub failed: Vec<ResumeId>,
}

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("an SLA sweep is already running")]
    AlreadyRunning,
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

pub struct SlaMonitor<R, D, N> {
    repository: Arc<R>,
    directory: Arc<D>,
    sink: Arc<N>,
    clock: Arc<dyn Clock>,
    config: SlaMonitorConfig,
    running: AtomicBool,
}

/// Clears the running flag however the sweep ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<R, D, N> SlaMonitor<R, D, N>
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
        config: SlaMonitorConfig,
    ) -> Self {
        Self {
            repository,
            directory,
            sink,
            clock,
            config,
            running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SlaMonitorConfig {
        &self.config
    }

    /// Sweep with the configured lookahead.
    pub fn sweep(&self) -> Result<SweepReport, SweepError> {
        self.run_sla_sweep(self.config.lookahead)
    }

    /// One breach scan followed by one imminent scan. A failing candidate is logged and
    /// reported; a failing scan query aborts the sweep.
    pub fn run_sla_sweep(&self, lookahead: Duration) -> Result<SweepReport, SweepError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SweepError::AlreadyRunning);
        }
        let _guard = RunningGuard(&self.running);

        let now = self.clock.now();
        let mut report = SweepReport::default();

        let breached = self.repository.query(&ResumeFilter {
            statuses: Some(ResumeStatus::SLA_BEARING.to_vec()),
            is_overdue: Some(false),
            deadline: Some(DeadlineWindow::Before(now)),
            ..ResumeFilter::default()
        })?;
        for candidate in breached {
            match self.flag_overdue(&candidate.id, now) {
                Ok(Some(flagged)) => report.overdue.push(flagged),
                Ok(None) => report.skipped.push(candidate.id),
                Err(err) => {
                    warn!(resume_id = %candidate.id, error = %err, "failed to flag overdue resume");
                    report.failed.push(candidate.id);
                }
            }
        }

        let imminent = self.repository.query(&ResumeFilter {
            statuses: Some(ResumeStatus::SLA_BEARING.to_vec()),
            is_overdue: Some(false),
            deadline: Some(DeadlineWindow::Between {
                after: now,
                until: now
                    .checked_add_signed(lookahead)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            }),
            ..ResumeFilter::default()
        })?;
        for candidate in imminent {
            match self.remind(&candidate, now) {
                Ok(()) => report.imminent.push(candidate),
                Err(err) => {
                    warn!(resume_id = %candidate.id, error = %err, "failed to send SLA reminder");
                    report.failed.push(candidate.id);
                }
            }
        }

        info!(
            overdue = report.overdue.len(),
            imminent = report.imminent.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "SLA sweep completed"
        );
        Ok(report)
    }

    fn flag_overdue(
        &self,
        id: &ResumeId,
        now: DateTime<Utc>,
    ) -> Result<Option<ResumeRecord>, RepositoryError> {
        let Some(current) = self.repository.fetch(id)? else {
            return Ok(None);
        };
        let deadline = match current.sla_deadline {
            Some(deadline)
                if current.status.is_sla_bearing() && !current.is_overdue && deadline < now =>
            {
                deadline
            }
            _ => return Ok(None),
        };

        let mut next = current.clone();
        next.is_overdue = true;
        next.updated_at = Some(now);

        let overdue_for = format_overdue(now - deadline);
        let notices =
            Notices::new(&*self.directory, &next, now).with_overdue(overdue_for.clone());
        let handler_name = notices.handler_name()?;
        let stage = next.status.label();
        let mut notifications = Vec::new();

        if let Some(handler) = next.current_handler.as_ref() {
            if let Some(person) = notices.active_person(handler)? {
                notifications.push(notices.compose(
                    &person,
                    Severity::Urgent,
                    "Resume overdue",
                    format!(
                        "Resume of {} is overdue by {overdue_for} at stage \"{stage}\"; act now or record a reason.",
                        next.candidate_name
                    ),
                )?);
            }
        }
        if let Some(department) = next.l2_department.as_ref() {
            for manager in notices.l2_managers(department)? {
                if next.current_handler.as_ref() == Some(&manager.id) {
                    continue;
                }
                notifications.push(notices.compose(
                    &manager,
                    Severity::Warning,
                    "Overdue resume escalation",
                    format!(
                        "Resume of {} is overdue by {overdue_for} at stage \"{stage}\"; handler: {handler_name}.",
                        next.candidate_name
                    ),
                )?);
            }
        }

        let entry = AuditEntry::transition(
            &current,
            &next,
            None,
            ActionType::OverdueFlagged,
            Some(format!("overdue by {overdue_for}")),
            now,
        );
        let committed = self.repository.commit(
            current.version,
            Mutation {
                record: next,
                entry,
                notifications: notifications.clone(),
            },
        );
        match committed {
            Ok(stored) => {
                info!(
                    resume_id = %stored.id,
                    status = %stored.status,
                    overdue_for = %overdue_for,
                    "resume flagged overdue"
                );
                deliver(&*self.sink, &notifications);
                Ok(Some(stored))
            }
            Err(RepositoryError::Conflict) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Reminders leave the item and its audit trail untouched.
    fn remind(&self, record: &ResumeRecord, now: DateTime<Utc>) -> Result<(), RepositoryError> {
        let Some(deadline) = record.sla_deadline else {
            return Ok(());
        };
        let Some(handler) = record.current_handler.as_ref() else {
            return Ok(());
        };
        let notices = Notices::new(&*self.directory, record, now);
        let Some(person) = notices.active_person(handler)? else {
            return Ok(());
        };

        let notification = notices.compose(
            &person,
            Severity::Warning,
            "SLA deadline approaching",
            format!(
                "Resume of {} is due in {} at stage \"{}\".",
                record.candidate_name,
                format_remaining(deadline - now),
                record.status.label()
            ),
        )?;
        self.repository
            .append_notifications(vec![notification.clone()])?;
        deliver(&*self.sink, std::slice::from_ref(&notification));
        Ok(())
    }
}
