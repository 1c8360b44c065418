use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::resume::domain::{
    AuditEntry, Department, DepartmentId, DepartmentLevel, NewResume, Notification,
    NotificationId, Person, PersonId, ResumeId, ResumeRecord, ResumeStatus, Role,
};
use crate::workflows::resume::{
    resume_router, Clock, ManualClock, MemoryDirectory, MemoryNotificationSink,
    MemoryResumeStore, Mutation, NotificationSink, RepositoryError, ResumeApi, ResumeFilter,
    ResumeRepository, ResumeWorkflowService, SinkError, SlaMonitor, SlaMonitorConfig, SlaPolicy,
};

pub(super) fn pid(id: &str) -> PersonId {
    PersonId(id.to_string())
}

pub(super) fn did(id: &str) -> DepartmentId {
    DepartmentId(id.to_string())
}

pub(super) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()
}

pub(super) fn intake(name: &str) -> NewResume {
    NewResume {
        candidate_name: name.to_string(),
        source: "referral".to_string(),
        document_ref: Some(format!("docs/{}.pdf", name.to_lowercase().replace(' ', "-"))),
    }
}

/// Two level-2 departments, each with one level-3 team, plus one person per role.
pub(super) fn directory() -> MemoryDirectory {
    let directory = MemoryDirectory::default();
    for department in [
        Department {
            id: did("d2-eng"),
            name: "Engineering".to_string(),
            level: DepartmentLevel::Level2,
            parent: None,
        },
        Department {
            id: did("d3-backend"),
            name: "Backend".to_string(),
            level: DepartmentLevel::Level3,
            parent: Some(did("d2-eng")),
        },
        Department {
            id: did("d2-sales"),
            name: "Sales".to_string(),
            level: DepartmentLevel::Level2,
            parent: None,
        },
        Department {
            id: did("d3-field"),
            name: "Field Sales".to_string(),
            level: DepartmentLevel::Level3,
            parent: Some(did("d2-sales")),
        },
    ] {
        directory.add_department(department).expect("department registers");
    }

    for (id, name, role, department) in [
        ("hr-1", "Hana Recruiter", Role::Hr, None),
        ("mgr-eng", "Mara Manager", Role::L2Manager, Some("d2-eng")),
        ("mgr-eng-2", "Milo Manager", Role::L2Manager, Some("d2-eng")),
        ("mgr-sales", "Sam Seller", Role::L2Manager, Some("d2-sales")),
        ("asst-backend", "Ari Assistant", Role::L3Assistant, Some("d3-backend")),
        ("expert-ada", "Ada Expert", Role::Expert, Some("d3-backend")),
        ("expert-bo", "Bo Expert", Role::Expert, Some("d3-backend")),
    ] {
        directory
            .add_person(Person {
                id: pid(id),
                name: name.to_string(),
                role,
                department: department.map(did),
                active: true,
            })
            .expect("person registers");
    }
    directory
}

pub(super) struct Harness<R = MemoryResumeStore, N = MemoryNotificationSink> {
    pub(super) service: Arc<ResumeWorkflowService<R, MemoryDirectory, N>>,
    pub(super) monitor: Arc<SlaMonitor<R, MemoryDirectory, N>>,
    pub(super) store: Arc<R>,
    pub(super) directory: Arc<MemoryDirectory>,
    pub(super) sink: Arc<N>,
    pub(super) clock: Arc<ManualClock>,
}

pub(super) fn harness() -> Harness {
    harness_with(MemoryResumeStore::default(), MemoryNotificationSink::default())
}

pub(super) fn harness_with<R, N>(store: R, sink: N) -> Harness<R, N>
where
    R: ResumeRepository + 'static,
    N: NotificationSink + 'static,
{
    let store = Arc::new(store);
    let directory = Arc::new(directory());
    let sink = Arc::new(sink);
    let clock = Arc::new(ManualClock::new(start()));
    let shared_clock: Arc<dyn Clock> = clock.clone();

    let service = Arc::new(ResumeWorkflowService::new(
        store.clone(),
        directory.clone(),
        sink.clone(),
        shared_clock.clone(),
        SlaPolicy::default(),
    ));
    let monitor = Arc::new(SlaMonitor::new(
        store.clone(),
        directory.clone(),
        sink.clone(),
        shared_clock,
        SlaMonitorConfig::default(),
    ));

    Harness {
        service,
        monitor,
        store,
        directory,
        sink,
        clock,
    }
}

impl<R, N> Harness<R, N>
where
    R: ResumeRepository + 'static,
    N: NotificationSink + 'static,
{
    pub(super) fn router(&self) -> axum::Router {
        resume_router(Arc::new(ResumeApi {
            service: self.service.clone(),
            monitor: self.monitor.clone(),
        }))
    }

    pub(super) fn upload(&self, name: &str) -> ResumeRecord {
        self.service
            .upload(intake(name), &pid("hr-1"))
            .expect("upload succeeds")
    }

    /// Upload a résumé and walk it along the happy path until it reaches `target`.
    pub(super) fn item_in(&self, target: ResumeStatus) -> ResumeRecord {
        let mut record = self.upload("Grace Hopper");
        let steps = [
            ResumeStatus::PoolL2,
            ResumeStatus::PoolL3,
            ResumeStatus::WaitIdentify,
            ResumeStatus::WaitContactInfo,
            ResumeStatus::WaitConnection,
            ResumeStatus::WaitFeedback,
            ResumeStatus::Archived,
        ];
        if target == ResumeStatus::PoolHr {
            return record;
        }
        for next in steps {
            record = self.advance(&record.id, next);
            if next == target {
                return record;
            }
        }
        panic!("{target} is not on the happy path");
    }

    fn advance(&self, id: &ResumeId, next: ResumeStatus) -> ResumeRecord {
        let service = &self.service;
        let outcome = match next {
            ResumeStatus::PoolL2 => service.submit_for_l2(id, &pid("hr-1"), &did("d2-eng")),
            ResumeStatus::PoolL3 => service.route_to_l3(id, &pid("mgr-eng"), &did("d3-backend")),
            ResumeStatus::WaitIdentify => {
                service.assign_expert(id, &pid("asst-backend"), &pid("expert-ada"))
            }
            ResumeStatus::WaitContactInfo => {
                service.record_identification(id, &pid("expert-ada"), true, None)
            }
            ResumeStatus::WaitConnection => service.fill_contact_info(
                id,
                &pid("mgr-eng"),
                Some("grace@example.com".to_string()),
                None,
            ),
            ResumeStatus::WaitFeedback => service.start_connection(id, &pid("expert-ada")),
            ResumeStatus::Archived => {
                service.submit_feedback(id, &pid("expert-ada"), "hired".to_string(), true)
            }
            other => panic!("no happy-path step into {other}"),
        };
        outcome.expect("happy-path step succeeds")
    }

    pub(super) fn stored(&self, id: &ResumeId) -> ResumeRecord {
        self.store
            .fetch(id)
            .expect("fetch succeeds")
            .expect("record present")
    }

    /// Audit entries oldest first.
    pub(super) fn history(&self, id: &ResumeId) -> Vec<AuditEntry> {
        let mut entries = self.store.audit_log(id).expect("audit log readable");
        entries.reverse();
        entries
    }

    pub(super) fn inbox(&self, person: &str) -> Vec<Notification> {
        self.store
            .notifications_for(&pid(person), false, usize::MAX)
            .expect("inbox readable")
    }
}

impl<R> Harness<R, MemoryNotificationSink> {
    pub(super) fn delivered_to(&self, person: &str) -> Vec<Notification> {
        self.sink
            .events()
            .into_iter()
            .filter(|note| note.recipient == pid(person))
            .collect()
    }
}

/// Store whose backend is down.
pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("offline".to_string()))
}

impl ResumeRepository for UnavailableStore {
    fn insert(&self, _: ResumeRecord, _: AuditEntry) -> Result<ResumeRecord, RepositoryError> {
        offline()
    }

    fn fetch(&self, _: &ResumeId) -> Result<Option<ResumeRecord>, RepositoryError> {
        offline()
    }

    fn commit(&self, _: u64, _: Mutation) -> Result<ResumeRecord, RepositoryError> {
        offline()
    }

    fn query(&self, _: &ResumeFilter) -> Result<Vec<ResumeRecord>, RepositoryError> {
        offline()
    }

    fn audit_log(&self, _: &ResumeId) -> Result<Vec<AuditEntry>, RepositoryError> {
        offline()
    }

    fn audit_entries(&self) -> Result<Vec<AuditEntry>, RepositoryError> {
        offline()
    }

    fn append_notifications(&self, _: Vec<Notification>) -> Result<(), RepositoryError> {
        offline()
    }

    fn notifications_for(
        &self,
        _: &PersonId,
        _: bool,
        _: usize,
    ) -> Result<Vec<Notification>, RepositoryError> {
        offline()
    }

    fn mark_read(&self, _: &PersonId, _: &NotificationId) -> Result<(), RepositoryError> {
        offline()
    }

    fn mark_all_read(&self, _: &PersonId) -> Result<usize, RepositoryError> {
        offline()
    }

    fn delete_notification(&self, _: &PersonId, _: &NotificationId) -> Result<(), RepositoryError> {
        offline()
    }
}

/// Memory store whose next `query` returns a snapshot taken earlier, and which can refuse
/// commits for one record.
#[derive(Default)]
pub(super) struct SnapshotStore {
    pub(super) inner: MemoryResumeStore,
    pub(super) snapshot: Mutex<Option<Vec<ResumeRecord>>>,
    pub(super) refuse_commit: Mutex<Option<ResumeId>>,
}

impl ResumeRepository for SnapshotStore {
    fn insert(
        &self,
        record: ResumeRecord,
        entry: AuditEntry,
    ) -> Result<ResumeRecord, RepositoryError> {
        self.inner.insert(record, entry)
    }

    fn fetch(&self, id: &ResumeId) -> Result<Option<ResumeRecord>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn commit(&self, expected: u64, mutation: Mutation) -> Result<ResumeRecord, RepositoryError> {
        let refused = self.refuse_commit.lock().expect("refusal mutex poisoned");
        if refused.as_ref() == Some(&mutation.record.id) {
            return Err(RepositoryError::Unavailable("write shard offline".to_string()));
        }
        drop(refused);
        self.inner.commit(expected, mutation)
    }

    fn query(&self, filter: &ResumeFilter) -> Result<Vec<ResumeRecord>, RepositoryError> {
        let stale = self.snapshot.lock().expect("snapshot mutex poisoned").take();
        match stale {
            Some(records) => Ok(records),
            None => self.inner.query(filter),
        }
    }

    fn audit_log(&self, id: &ResumeId) -> Result<Vec<AuditEntry>, RepositoryError> {
        self.inner.audit_log(id)
    }

    fn audit_entries(&self) -> Result<Vec<AuditEntry>, RepositoryError> {
        self.inner.audit_entries()
    }

    fn append_notifications(&self, notifications: Vec<Notification>) -> Result<(), RepositoryError> {
        self.inner.append_notifications(notifications)
    }

    fn notifications_for(
        &self,
        recipient: &PersonId,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Notification>, RepositoryError> {
        self.inner.notifications_for(recipient, unread_only, limit)
    }

    fn mark_read(&self, recipient: &PersonId, id: &NotificationId) -> Result<(), RepositoryError> {
        self.inner.mark_read(recipient, id)
    }

    fn mark_all_read(&self, recipient: &PersonId) -> Result<usize, RepositoryError> {
        self.inner.mark_all_read(recipient)
    }

    fn delete_notification(
        &self,
        recipient: &PersonId,
        id: &NotificationId,
    ) -> Result<(), RepositoryError> {
        self.inner.delete_notification(recipient, id)
    }
}

/// Sink whose transport always fails.
#[derive(Default)]
pub(super) struct FailingSink;

impl NotificationSink for FailingSink {
    fn enqueue(&self, _: &Notification) -> Result<(), SinkError> {
        Err(SinkError::Transport("smtp relay refused".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("valid json")
}
