use chrono::{DateTime, Utc};

use super::domain::{
    DepartmentId, DepartmentLevel, Notification, NotificationId, Person, PersonId, ResumeRecord,
    Role, Severity,
};
use super::repository::{Directory, RepositoryError};

/// Builds notifications about one item, resolving recipients through the directory.
pub(crate) struct Notices<'a, D> {
    directory: &'a D,
    record: &'a ResumeRecord,
    now: DateTime<Utc>,
    overdue_for: Option<String>,
}

impl<'a, D: Directory> Notices<'a, D> {
    pub(crate) fn new(directory: &'a D, record: &'a ResumeRecord, now: DateTime<Utc>) -> Self {
        Self {
            directory,
            record,
            now,
            overdue_for: None,
        }
    }

    pub(crate) fn with_overdue(mut self, overdue_for: String) -> Self {
        self.overdue_for = Some(overdue_for);
        self
    }

    /// The person if they exist and are active.
    pub(crate) fn active_person(&self, id: &PersonId) -> Result<Option<Person>, RepositoryError> {
        Ok(self.directory.person(id)?.filter(|person| person.active))
    }

    /// Active level-2 managers; a level-3 department resolves to its parent.
    pub(crate) fn l2_managers(
        &self,
        department: &DepartmentId,
    ) -> Result<Vec<Person>, RepositoryError> {
        let Some(found) = self.directory.department(department)? else {
            return Ok(Vec::new());
        };
        let target = match (found.level, found.parent) {
            (DepartmentLevel::Level3, Some(parent)) => parent,
            (DepartmentLevel::Level3, None) => return Ok(Vec::new()),
            (DepartmentLevel::Level2, _) => found.id,
        };
        self.directory.active_members(&target, Role::L2Manager)
    }

    pub(crate) fn members(
        &self,
        department: &DepartmentId,
        role: Role,
    ) -> Result<Vec<Person>, RepositoryError> {
        self.directory.active_members(department, role)
    }

    /// Display name of whoever should act next.
    pub(crate) fn handler_name(&self) -> Result<String, RepositoryError> {
        let candidate = self
            .record
            .current_handler
            .as_ref()
            .or(self.record.expert.as_ref());
        let name = match candidate {
            Some(id) => self
                .directory
                .person(id)?
                .map(|person| person.name)
                .unwrap_or_else(|| id.0.clone()),
            None => "unassigned".to_string(),
        };
        Ok(name)
    }

    pub(crate) fn compose(
        &self,
        recipient: &Person,
        severity: Severity,
        title: &str,
        body: String,
    ) -> Result<Notification, RepositoryError> {
        Ok(Notification {
            id: NotificationId::generate(),
            recipient: recipient.id.clone(),
            resume_id: Some(self.record.id.clone()),
            title: title.to_string(),
            body,
            severity,
            current_handler: Some(self.handler_name()?),
            current_stage: Some(self.record.status.label().to_string()),
            overdue_for: self.overdue_for.clone(),
            link: Some(self.record.link()),
            is_read: false,
            created_at: self.now,
        })
    }

    /// Same message for every recipient.
    pub(crate) fn broadcast(
        &self,
        recipients: &[Person],
        severity: Severity,
        title: &str,
        body: &str,
    ) -> Result<Vec<Notification>, RepositoryError> {
        recipients
            .iter()
            .map(|person| self.compose(person, severity, title, body.to_string()))
            .collect()
    }
}
