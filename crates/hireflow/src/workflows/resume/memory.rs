//! In-process adapters for the store, directory, and notification sink.
//!
//! A single mutex guards each adapter, which gives the per-item atomic unit the workflow
//! needs: the version check and the three writes of a commit happen under one lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    AuditEntry, Department, DepartmentId, DepartmentLevel, Notification, NotificationId, Person,
    PersonId, ResumeId, ResumeRecord, Role,
};
use super::repository::{
    Directory, Mutation, NotificationSink, RepositoryError, ResumeFilter, ResumeRepository,
    SinkError,
};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
}

#[derive(Default)]
struct StoreState {
    records: HashMap<ResumeId, ResumeRecord>,
    audit: Vec<AuditEntry>,
    notifications: Vec<Notification>,
}

#[derive(Default, Clone)]
pub struct MemoryResumeStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryResumeStore {
    /// Every stored notification, oldest first.
    pub fn all_notifications(&self) -> Vec<Notification> {
        lock(&self.state)
            .map(|state| state.notifications.clone())
            .unwrap_or_default()
    }
}

impl ResumeRepository for MemoryResumeStore {
    fn insert(
        &self,
        record: ResumeRecord,
        entry: AuditEntry,
    ) -> Result<ResumeRecord, RepositoryError> {
        let mut state = lock(&self.state)?;
        if state.records.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        state.records.insert(record.id.clone(), record.clone());
        state.audit.push(entry);
        Ok(record)
    }

    fn fetch(&self, id: &ResumeId) -> Result<Option<ResumeRecord>, RepositoryError> {
        let state = lock(&self.state)?;
        Ok(state.records.get(id).cloned())
    }

    fn commit(
        &self,
        expected_version: u64,
        mutation: Mutation,
    ) -> Result<ResumeRecord, RepositoryError> {
        let mut state = lock(&self.state)?;
        let Mutation {
            mut record,
            entry,
            notifications,
        } = mutation;

        let stored = state
            .records
            .get(&record.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.version != expected_version {
            return Err(RepositoryError::Conflict);
        }

        record.version = expected_version + 1;
        state.records.insert(record.id.clone(), record.clone());
        state.audit.push(entry);
        state.notifications.extend(notifications);
        Ok(record)
    }

    fn query(&self, filter: &ResumeFilter) -> Result<Vec<ResumeRecord>, RepositoryError> {
        let state = lock(&self.state)?;
        let mut matches: Vec<ResumeRecord> = state
            .records
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(matches)
    }

    fn audit_log(&self, id: &ResumeId) -> Result<Vec<AuditEntry>, RepositoryError> {
        let state = lock(&self.state)?;
        Ok(state
            .audit
            .iter()
            .rev()
            .filter(|entry| &entry.resume_id == id)
            .cloned()
            .collect())
    }

    fn audit_entries(&self) -> Result<Vec<AuditEntry>, RepositoryError> {
        let state = lock(&self.state)?;
        Ok(state.audit.clone())
    }

    fn append_notifications(
        &self,
        notifications: Vec<Notification>,
    ) -> Result<(), RepositoryError> {
        let mut state = lock(&self.state)?;
        state.notifications.extend(notifications);
        Ok(())
    }

    fn notifications_for(
        &self,
        recipient: &PersonId,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let state = lock(&self.state)?;
        Ok(state
            .notifications
            .iter()
            .rev()
            .filter(|note| &note.recipient == recipient && (!unread_only || !note.is_read))
            .take(limit)
            .cloned()
            .collect())
    }

    fn mark_read(&self, recipient: &PersonId, id: &NotificationId) -> Result<(), RepositoryError> {
        let mut state = lock(&self.state)?;
        let note = state
            .notifications
            .iter_mut()
            .find(|note| &note.id == id && &note.recipient == recipient)
            .ok_or(RepositoryError::NotFound)?;
        note.is_read = true;
        Ok(())
    }

    fn mark_all_read(&self, recipient: &PersonId) -> Result<usize, RepositoryError> {
        let mut state = lock(&self.state)?;
        let mut marked = 0;
        for note in state
            .notifications
            .iter_mut()
            .filter(|note| &note.recipient == recipient && !note.is_read)
        {
            note.is_read = true;
            marked += 1;
        }
        Ok(marked)
    }

    fn delete_notification(
        &self,
        recipient: &PersonId,
        id: &NotificationId,
    ) -> Result<(), RepositoryError> {
        let mut state = lock(&self.state)?;
        let before = state.notifications.len();
        state
            .notifications
            .retain(|note| !(&note.id == id && &note.recipient == recipient));
        if state.notifications.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Registration failures for the in-memory directory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("level-2 department {0} cannot have a parent")]
    UnexpectedParent(DepartmentId),
    #[error("level-3 department {department} needs an existing level-2 parent")]
    InvalidParent { department: DepartmentId },
    #[error("{role:?} {person} must belong to an existing department")]
    MissingDepartment { person: PersonId, role: Role },
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

#[derive(Default)]
struct DirectoryState {
    people: HashMap<PersonId, Person>,
    departments: HashMap<DepartmentId, Department>,
}

#[derive(Default, Clone)]
pub struct MemoryDirectory {
    state: Arc<Mutex<DirectoryState>>,
}

impl MemoryDirectory {
    pub fn add_department(&self, department: Department) -> Result<(), DirectoryError> {
        let mut state = lock(&self.state)?;
        match (department.level, &department.parent) {
            (DepartmentLevel::Level2, Some(_)) => {
                return Err(DirectoryError::UnexpectedParent(department.id));
            }
            (DepartmentLevel::Level3, Some(parent)) => {
                let valid = state
                    .departments
                    .get(parent)
                    .is_some_and(|parent| parent.level == DepartmentLevel::Level2);
                if !valid {
                    return Err(DirectoryError::InvalidParent {
                        department: department.id,
                    });
                }
            }
            _ => {}
        }
        state.departments.insert(department.id.clone(), department);
        Ok(())
    }

    pub fn add_person(&self, person: Person) -> Result<(), DirectoryError> {
        let mut state = lock(&self.state)?;
        if person.role.is_department_scoped() {
            let known = person
                .department
                .as_ref()
                .is_some_and(|id| state.departments.contains_key(id));
            if !known {
                return Err(DirectoryError::MissingDepartment {
                    person: person.id,
                    role: person.role,
                });
            }
        }
        state.people.insert(person.id.clone(), person);
        Ok(())
    }

    pub fn set_active(&self, id: &PersonId, active: bool) -> Result<(), DirectoryError> {
        let mut state = lock(&self.state)?;
        let person = state.people.get_mut(id).ok_or(RepositoryError::NotFound)?;
        person.active = active;
        Ok(())
    }
}

impl Directory for MemoryDirectory {
    fn person(&self, id: &PersonId) -> Result<Option<Person>, RepositoryError> {
        Ok(lock(&self.state)?.people.get(id).cloned())
    }

    fn department(&self, id: &DepartmentId) -> Result<Option<Department>, RepositoryError> {
        Ok(lock(&self.state)?.departments.get(id).cloned())
    }

    fn active_members(
        &self,
        department: &DepartmentId,
        role: Role,
    ) -> Result<Vec<Person>, RepositoryError> {
        let state = lock(&self.state)?;
        let mut members: Vec<Person> = state
            .people
            .values()
            .filter(|person| person.active && person.role == role && person.belongs_to(department))
            .cloned()
            .collect();
        members.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(members)
    }
}

/// Sink that keeps every enqueued message for inspection.
#[derive(Default, Clone)]
pub struct MemoryNotificationSink {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotificationSink {
    pub fn events(&self) -> Vec<Notification> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl NotificationSink for MemoryNotificationSink {
    fn enqueue(&self, notification: &Notification) -> Result<(), SinkError> {
        self.events
            .lock()
            .map_err(|_| SinkError::Transport("sink mutex poisoned".to_string()))?
            .push(notification.clone());
        Ok(())
    }
}
